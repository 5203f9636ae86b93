use std::sync::Arc;
use std::time::SystemTime;

use crate::core::metrics::{ProcessInfo, Reading};
use crate::core::types::{MetricId, Unit};
use crate::error::{BackendError, BackendResult};

/// A metric a source can report, with its unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub id: MetricId,
    pub unit: Unit,
}

impl MetricDescriptor {
    pub fn new(id: impl Into<MetricId>, unit: Unit) -> Self {
        Self { id: id.into(), unit }
    }
}

/// Untyped values returned by a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub values: Vec<(MetricId, f64)>,
    pub processes: Option<Vec<ProcessInfo>>,
}

impl RawSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, metric: impl Into<MetricId>, value: f64) -> Self {
        self.push(metric, value);
        self
    }

    pub fn with_processes(mut self, processes: Vec<ProcessInfo>) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn push(&mut self, metric: impl Into<MetricId>, value: f64) {
        self.values.push((metric.into(), value));
    }

    /// Adds the value only when the backend produced one
    pub fn push_opt(&mut self, metric: impl Into<MetricId>, value: Option<f64>) {
        if let Some(value) = value {
            self.push(metric, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.processes.is_none()
    }

    /// Rejects NaN and infinite values
    pub fn check_finite(&self) -> BackendResult<()> {
        match self.values.iter().find(|(_, v)| !v.is_finite()) {
            Some((id, v)) => Err(BackendError::parse(format!("{id} is not a finite number ({v})"))),
            None => Ok(()),
        }
    }
}

/// The chain moved to a different backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSwitch {
    /// Backend used before, `None` if the source was unavailable
    pub from: Option<String>,
    pub to: String,
    /// Whether `to` is a fallback backend
    pub degraded: bool,
}

/// One successful pass over a source's backend chain
#[derive(Debug, Clone)]
pub struct Sample {
    pub readings: Vec<Reading>,
    pub processes: Option<Arc<[ProcessInfo]>>,
    /// Backend that served this sample
    pub backend: String,
    /// Served by a non-primary backend
    pub degraded: bool,
    /// Set on the first sample after the serving backend changed
    pub switch: Option<BackendSwitch>,
    /// Described metrics the serving backend did not report
    pub missing: Vec<MetricId>,
    pub timestamp: SystemTime,
}

impl Sample {
    pub fn reading(&self, metric: &MetricId) -> Option<&Reading> {
        self.readings.iter().find(|r| &r.metric == metric)
    }
}
