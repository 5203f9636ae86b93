//! # Core Metrics Module
//!
//! Defines [`Reading`], the single immutable measurement produced by a metric
//! source and consumed by history buffers and threshold evaluators.
//!
//! ## Example
//!
//! ```rust
//! use host_sentinel::core::metrics::Reading;
//! use host_sentinel::core::types::Unit;
//!
//! let reading = Reading::new("cpu.usage", 42.5, Unit::Percent, "proc-stat");
//! assert_eq!(reading.value, 42.5);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::core::types::{MetricId, Unit};

/// A single metric measurement with a timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// The metric this value belongs to
    pub metric: MetricId,
    /// The measured value
    pub value: f64,
    /// Unit of `value`
    pub unit: Unit,
    /// When the backend produced the value
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
    /// Name of the backend that produced the value
    pub backend: String,
}

impl Reading {
    /// Creates a new reading stamped with the current time
    pub fn new(metric: impl Into<MetricId>, value: f64, unit: Unit, backend: impl Into<String>) -> Self {
        Self::with_timestamp(metric, value, unit, backend, SystemTime::now())
    }

    /// Creates a new reading with a specific timestamp
    pub fn with_timestamp(
        metric: impl Into<MetricId>,
        value: f64,
        unit: Unit,
        backend: impl Into<String>,
        timestamp: SystemTime,
    ) -> Self {
        Self { metric: metric.into(), value, unit, timestamp, backend: backend.into() }
    }
}

/// A process as seen in one tick's process table snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// CPU usage, where 100.0 is one full core
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f64, memory_mb: f64) -> Self {
        Self { pid, name: name.into(), cpu_percent, memory_mb }
    }
}

/// Milliseconds since the Unix epoch, saturating at zero for pre-epoch clocks
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

pub(crate) fn serialize_epoch_millis<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(epoch_millis(*time))
}

pub(crate) fn serialize_opt_epoch_millis<S: Serializer>(
    time: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        Some(t) => serializer.serialize_some(&epoch_millis(*t)),
        None => serializer.serialize_none(),
    }
}
