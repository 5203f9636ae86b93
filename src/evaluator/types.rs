use std::time::SystemTime;

use serde::Serialize;

use crate::core::metrics::{serialize_epoch_millis, serialize_opt_epoch_millis};
use crate::core::types::{MetricId, Severity};

/// Debounce state of one metric. Only [`super::ThresholdEvaluator`] mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorState {
    /// Last committed severity
    pub current_severity: Severity,
    /// Severity the recent raw classifications agree on
    pub candidate_severity: Severity,
    /// How many consecutive samples classified as `candidate_severity`
    pub consecutive_count: u32,
    #[serde(serialize_with = "serialize_opt_epoch_millis")]
    pub last_transition: Option<SystemTime>,
    /// Consecutive ticks without a reading
    pub consecutive_unavailable: u32,
    /// Set once `consecutive_unavailable` reached the configured limit
    pub unknown: bool,
}

impl Default for EvaluatorState {
    fn default() -> Self {
        Self {
            current_severity: Severity::Normal,
            candidate_severity: Severity::Normal,
            consecutive_count: 0,
            last_transition: None,
            consecutive_unavailable: 0,
            unknown: false,
        }
    }
}

/// A committed severity change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionEvent {
    pub metric: MetricId,
    pub old_severity: Severity,
    pub new_severity: Severity,
    /// The value that completed the debounce run
    pub value: f64,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
}

impl TransitionEvent {
    pub fn is_escalation(&self) -> bool {
        self.new_severity > self.old_severity
    }

    pub fn is_recovery(&self) -> bool {
        self.new_severity < self.old_severity
    }
}

/// A metric went without readings for the configured number of ticks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownEvent {
    pub metric: MetricId,
    /// Severity committed before the outage; it is kept, not reset
    pub last_severity: Severity,
    pub consecutive_unavailable: u32,
    pub reason: String,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
}

/// Readings resumed for a metric previously reported Unknown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoredEvent {
    pub metric: MetricId,
    pub missed_ticks: u32,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
}

/// Anything externally visible an evaluator tick can produce
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatorEvent {
    Transition(TransitionEvent),
    Unknown(UnknownEvent),
    Restored(RestoredEvent),
}
