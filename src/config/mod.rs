//! Monitor configuration
//!
//! Configuration is plain data, loaded once at startup from TOML and
//! validated before anything else is built. A [`MetricSpec`] whose warning
//! and critical thresholds contradict its comparison direction is rejected
//! with [`Error::ConfigInvalid`]; nothing is silently defaulted.
//!
//! # Examples
//!
//! ```rust
//! use host_sentinel::config::MonitorConfig;
//!
//! let config = MonitorConfig::from_toml_str(r#"
//!     interval_secs = 2
//!
//!     [[metrics]]
//!     id = "cpu.usage"
//!     warning = 85
//!     critical = 98
//!     debounce = 3
//!     unit = "percent"
//! "#).unwrap();
//!
//! assert_eq!(config.metrics.len(), 1);
//! assert_eq!(config.metrics[0].debounce_count, 3);
//! ```

pub mod constants;


use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::types::{Comparison, MetricId, Unit};
use crate::error::{Error, Result};
use crate::policy::CorrectiveKind;
use constants::*;

/// Which value the evaluator compares against the thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationBasis {
    /// The reading of the current tick
    #[default]
    Current,
    /// The mean of the trailing `n` readings, including the current one
    Average(usize),
}

/// Threshold definition for a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub id: MetricId,
    #[serde(alias = "warning")]
    pub warning_threshold: f64,
    #[serde(alias = "critical")]
    pub critical_threshold: f64,
    /// Consecutive agreeing samples required to escalate
    #[serde(alias = "debounce", default = "default_debounce")]
    pub debounce_count: u32,
    /// Consecutive agreeing samples required to de-escalate; defaults to
    /// `debounce_count` (symmetric hysteresis)
    #[serde(alias = "recovery_debounce", default, skip_serializing_if = "Option::is_none")]
    pub recovery_debounce_count: Option<u32>,
    #[serde(default)]
    pub comparison: Comparison,
    pub unit: Unit,
    #[serde(default)]
    pub evaluate_on: EvaluationBasis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrective: Option<CorrectiveKind>,
}

fn default_debounce() -> u32 {
    DEFAULT_DEBOUNCE_COUNT
}

impl MetricSpec {
    /// Creates a greater-than spec with the default debounce count
    pub fn new(id: impl Into<MetricId>, warning: f64, critical: f64, unit: Unit) -> Self {
        Self {
            id: id.into(),
            warning_threshold: warning,
            critical_threshold: critical,
            debounce_count: DEFAULT_DEBOUNCE_COUNT,
            recovery_debounce_count: None,
            comparison: Comparison::GreaterThan,
            unit,
            evaluate_on: EvaluationBasis::Current,
            history_capacity: None,
            corrective: None,
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_debounce(mut self, count: u32) -> Self {
        self.debounce_count = count;
        self
    }

    pub fn with_recovery_debounce(mut self, count: u32) -> Self {
        self.recovery_debounce_count = Some(count);
        self
    }

    pub fn with_evaluation(mut self, basis: EvaluationBasis) -> Self {
        self.evaluate_on = basis;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    pub fn with_corrective(mut self, kind: CorrectiveKind) -> Self {
        self.corrective = Some(kind);
        self
    }

    /// Samples required before moving to a worse severity
    pub fn escalation_debounce(&self) -> u32 {
        self.debounce_count
    }

    /// Samples required before moving to a better severity
    pub fn recovery_debounce(&self) -> u32 {
        self.recovery_debounce_count.unwrap_or(self.debounce_count)
    }

    /// Checks the ordering and range invariants of this spec
    pub fn validate(&self) -> Result<()> {
        let id = &self.id;
        if id.as_str().trim().is_empty() {
            return Err(Error::config_invalid("metric id must not be empty"));
        }
        if !self.warning_threshold.is_finite() || !self.critical_threshold.is_finite() {
            return Err(Error::config_invalid(format!("{id}: thresholds must be finite numbers")));
        }
        let ordered = match self.comparison {
            Comparison::GreaterThan => self.critical_threshold >= self.warning_threshold,
            Comparison::LessThan => self.critical_threshold <= self.warning_threshold,
        };
        if !ordered {
            return Err(Error::config_invalid(format!(
                "{id}: critical threshold {} is not beyond warning threshold {} for {:?} comparison",
                self.critical_threshold, self.warning_threshold, self.comparison
            )));
        }
        if self.debounce_count == 0 {
            return Err(Error::config_invalid(format!("{id}: debounce count must be at least 1")));
        }
        if self.recovery_debounce_count == Some(0) {
            return Err(Error::config_invalid(format!("{id}: recovery debounce count must be at least 1")));
        }
        if self.history_capacity == Some(0) {
            return Err(Error::config_invalid(format!("{id}: history capacity must be at least 1")));
        }
        if self.evaluate_on == EvaluationBasis::Average(0) {
            return Err(Error::config_invalid(format!("{id}: average window must be at least 1")));
        }
        Ok(())
    }
}

/// Case-insensitive set of protected process names, kept in configured order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    names: Vec<String>,
    lowered: HashSet<String>,
}

impl Whitelist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for name in names {
            let name = name.into();
            if list.lowered.insert(name.to_lowercase()) {
                list.names.push(name);
            }
        }
        list
    }

    /// Exact, case-insensitive match
    pub fn contains(&self, process_name: &str) -> bool {
        self.lowered.contains(&process_name.to_lowercase())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Corrective action switches and limits. All corrective actions are off by
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Emit notify records on escalations and Unknown transitions
    pub notify: bool,
    /// Allow lowering the priority of offending processes
    pub lower_priority: bool,
    /// Allow asking the kernel to drop reclaimable caches
    pub reclaim_memory: bool,
    pub cooldown_secs: u64,
    /// Act on every eligible candidate instead of only the heaviest one
    pub aggressive: bool,
    pub max_targets: usize,
    pub nice_increment: i32,
    pub whitelist: Vec<String>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            notify: true,
            lower_priority: false,
            reclaim_memory: false,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            aggressive: false,
            max_targets: DEFAULT_MAX_TARGETS,
            nice_increment: DEFAULT_NICE_INCREMENT,
            whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ActionConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn whitelist(&self) -> Whitelist {
        Whitelist::new(self.whitelist.iter().cloned())
    }

    pub fn is_enabled(&self, kind: CorrectiveKind) -> bool {
        match kind {
            CorrectiveKind::LowerPriority => self.lower_priority,
            CorrectiveKind::ReclaimMemory => self.reclaim_memory,
        }
    }
}

/// Complete sampler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: f64,
    pub history_capacity: usize,
    pub backend_timeout_ms: u64,
    /// Consecutive unavailable ticks before a metric is reported Unknown
    pub unknown_after: u32,
    /// Forward every reading to the sink, not only transitions and actions
    pub emit_readings: bool,
    pub disk_path: PathBuf,
    pub latency_targets: Vec<String>,
    pub actions: ActionConfig,
    pub metrics: Vec<MetricSpec>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            backend_timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            unknown_after: DEFAULT_UNKNOWN_AFTER,
            emit_readings: false,
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            latency_targets: DEFAULT_LATENCY_TARGETS.iter().map(|s| s.to_string()).collect(),
            actions: ActionConfig::default(),
            metrics: default_metrics(),
        }
    }
}

/// Non-zero duration for a number of seconds, `None` when out of range
fn parse_interval(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}

fn default_metrics() -> Vec<MetricSpec> {
    vec![
        MetricSpec::new("cpu.usage", 90.0, 98.0, Unit::Percent).with_corrective(CorrectiveKind::LowerPriority),
        MetricSpec::new("cpu.temperature", 85.0, 95.0, Unit::Celsius).with_debounce(2),
        MetricSpec::new("memory.usage", 90.0, 95.0, Unit::Percent).with_corrective(CorrectiveKind::ReclaimMemory),
        MetricSpec::new("gpu.utilization", 90.0, 98.0, Unit::Percent),
        MetricSpec::new("gpu.temperature", 80.0, 90.0, Unit::Celsius).with_debounce(2),
        MetricSpec::new("gpu.vram_usage", 90.0, 97.0, Unit::Percent),
        MetricSpec::new("disk.usage", 90.0, 97.0, Unit::Percent).with_debounce(2),
        MetricSpec::new("disk.io_mb_s", 200.0, 400.0, Unit::MegabytesPerSecond),
        MetricSpec::new("net.latency_ms", 150.0, 500.0, Unit::Milliseconds),
        MetricSpec::new("net.jitter_ms", 30.0, 100.0, Unit::Milliseconds),
    ]
}

impl MonitorConfig {
    /// Parses and validates a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: MonitorConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Renders the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::invalid_data(e.to_string()))
    }

    /// Sample interval, or the default one when `interval_secs` is not a
    /// usable duration (see [`MonitorConfig::validate`])
    pub fn interval(&self) -> Duration {
        parse_interval(self.interval_secs).unwrap_or(Duration::from_secs_f64(DEFAULT_INTERVAL_SECS))
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// History capacity for one metric, honouring a per-metric override
    pub fn capacity_for(&self, spec: &MetricSpec) -> usize {
        spec.history_capacity.unwrap_or(self.history_capacity)
    }

    /// Looks up the spec of a metric
    pub fn spec(&self, id: &MetricId) -> Option<&MetricSpec> {
        self.metrics.iter().find(|m| &m.id == id)
    }

    /// Checks every global and per-metric invariant
    pub fn validate(&self) -> Result<()> {
        if parse_interval(self.interval_secs).is_none() {
            return Err(Error::config_invalid(format!(
                "interval_secs must be a positive duration, got {}",
                self.interval_secs
            )));
        }
        if self.history_capacity == 0 {
            return Err(Error::config_invalid("history_capacity must be at least 1"));
        }
        if self.backend_timeout_ms == 0 {
            return Err(Error::config_invalid("backend_timeout_ms must be at least 1"));
        }
        if self.unknown_after == 0 {
            return Err(Error::config_invalid("unknown_after must be at least 1"));
        }
        if self.actions.max_targets == 0 {
            return Err(Error::config_invalid("actions.max_targets must be at least 1"));
        }
        if self.actions.nice_increment <= 0 {
            return Err(Error::config_invalid("actions.nice_increment must be positive"));
        }

        let mut seen: HashMap<&MetricId, usize> = HashMap::new();
        for (index, spec) in self.metrics.iter().enumerate() {
            spec.validate()?;
            if let Some(previous) = seen.insert(&spec.id, index) {
                return Err(Error::config_invalid(format!(
                    "metric {} defined twice (entries {} and {})",
                    spec.id, previous, index
                )));
            }
        }
        Ok(())
    }
}
