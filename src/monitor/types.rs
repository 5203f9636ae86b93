use std::ops::AddAssign;
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::config::MetricSpec;
use crate::core::metrics::{serialize_epoch_millis, serialize_opt_epoch_millis, Reading};
use crate::core::types::{MetricId, Severity};

/// Point-in-time view of one metric, published after every evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub spec: MetricSpec,
    pub severity: Severity,
    /// No reading for `unknown_after` consecutive ticks
    pub unknown: bool,
    pub latest: Option<Reading>,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub history_len: usize,
    /// Backend that served the latest reading
    pub backend: Option<String>,
    pub degraded: bool,
    #[serde(serialize_with = "serialize_opt_epoch_millis")]
    pub last_transition: Option<SystemTime>,
}

impl MetricSnapshot {
    /// Snapshot of a metric that has not been evaluated yet
    pub fn empty(spec: MetricSpec) -> Self {
        Self {
            spec,
            severity: Severity::Normal,
            unknown: false,
            latest: None,
            average: None,
            min: None,
            max: None,
            history_len: 0,
            backend: None,
            degraded: false,
            last_transition: None,
        }
    }

    pub fn id(&self) -> &MetricId {
        &self.spec.id
    }
}

/// Snapshots of every configured metric, in configuration order
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub generated_at: SystemTime,
    pub metrics: Vec<Arc<MetricSnapshot>>,
}

impl StatusReport {
    pub fn get(&self, id: &MetricId) -> Option<&Arc<MetricSnapshot>> {
        self.metrics.iter().find(|m| m.id() == id)
    }

    /// Highest committed severity across all metrics
    pub fn worst_severity(&self) -> Severity {
        self.metrics.iter().map(|m| m.severity).max().unwrap_or_default()
    }

    pub fn unknown_metrics(&self) -> Vec<&MetricId> {
        self.metrics.iter().filter(|m| m.unknown).map(|m| m.id()).collect()
    }

    pub fn degraded_metrics(&self) -> Vec<&MetricId> {
        self.metrics.iter().filter(|m| m.degraded).map(|m| m.id()).collect()
    }
}

/// What one evaluation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationCounts {
    pub readings: usize,
    pub unavailable: usize,
    pub transitions: usize,
    pub actions: usize,
}

impl AddAssign for EvaluationCounts {
    fn add_assign(&mut self, other: Self) {
        self.readings += other.readings;
        self.unavailable += other.unavailable;
        self.transitions += other.transitions;
        self.actions += other.actions;
    }
}
