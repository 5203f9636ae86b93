//! # Core Types Module
//!
//! Fundamental value types shared by every part of the sampler: metric
//! identifiers, measurement units, the resource a metric belongs to, the
//! severity ladder and the comparison direction of a threshold.
//!
//! ## Example
//!
//! ```rust
//! use host_sentinel::core::types::{MetricId, Severity};
//!
//! let id = MetricId::new("cpu.usage");
//! assert_eq!(id.resource_prefix(), "cpu");
//! assert!(Severity::Critical > Severity::Warning);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a single metric, e.g. `cpu.usage` or `gpu.temperature`.
///
/// By convention the part before the first `.` names the resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricId(String);

impl MetricId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the resource part of the identifier (`gpu` for `gpu.temperature`)
    pub fn resource_prefix(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetricId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MetricId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for MetricId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Measurement unit of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Celsius,
    Megabytes,
    MegabytesPerSecond,
    Milliseconds,
    Watts,
    Megahertz,
    Count,
}

impl Unit {
    /// Short symbol used in log lines
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Celsius => "°C",
            Unit::Megabytes => "MB",
            Unit::MegabytesPerSecond => "MB/s",
            Unit::Milliseconds => "ms",
            Unit::Watts => "W",
            Unit::Megahertz => "MHz",
            Unit::Count => "",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Host resource a metric source samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Memory,
    Gpu,
    Disk,
    Network,
    Process,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Memory => "memory",
            Resource::Gpu => "gpu",
            Resource::Disk => "disk",
            Resource::Network => "network",
            Resource::Process => "process",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity. Ordered `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Direction in which a metric becomes worse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Higher values are worse (CPU usage, temperature)
    #[default]
    #[serde(alias = "gt")]
    GreaterThan,
    /// Lower values are worse (free space, battery)
    #[serde(alias = "lt")]
    LessThan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_id_prefix() {
        assert_eq!(MetricId::new("gpu.vram_used_mb").resource_prefix(), "gpu");
        assert_eq!(MetricId::new("plain").resource_prefix(), "plain");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Normal < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!(Severity::default(), Severity::Normal);
    }

    #[test]
    fn test_comparison_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            c: Comparison,
        }
        let w: Wrapper = toml::from_str("c = \"lt\"").unwrap();
        assert_eq!(w.c, Comparison::LessThan);
        let w: Wrapper = toml::from_str("c = \"greater_than\"").unwrap();
        assert_eq!(w.c, Comparison::GreaterThan);
    }
}
