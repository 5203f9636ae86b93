//! Threshold evaluation with debounce and hysteresis
//!
//! Every tick the evaluated value is classified against the metric's
//! thresholds. The classification only becomes the committed severity after
//! `debounce_count` consecutive samples agree on it (or
//! `recovery_debounce_count` when moving to a better severity), which keeps
//! single-sample spikes from producing alert flapping.
//!
//! Ticks without a reading neither advance nor reset the debounce run. After
//! `unknown_after` such ticks in a row the evaluator reports the metric as
//! Unknown, exactly once per outage.
//!
//! # Examples
//!
//! ```rust
//! use std::time::SystemTime;
//! use host_sentinel::config::MetricSpec;
//! use host_sentinel::core::types::{Severity, Unit};
//! use host_sentinel::evaluator::ThresholdEvaluator;
//!
//! let spec = MetricSpec::new("cpu.usage", 85.0, 98.0, Unit::Percent).with_debounce(3);
//! let mut evaluator = ThresholdEvaluator::new(spec, 3);
//!
//! let now = SystemTime::now();
//! assert!(evaluator.tick(80.0, now).is_empty());
//! assert!(evaluator.tick(86.0, now).is_empty());
//! assert!(evaluator.tick(87.0, now).is_empty());
//! let events = evaluator.tick(88.0, now);
//! assert_eq!(events.len(), 1);
//! assert_eq!(evaluator.state().current_severity, Severity::Warning);
//! ```

mod types;


pub use types::*;

use std::time::SystemTime;

use crate::config::MetricSpec;
use crate::core::types::{Comparison, Severity};

/// Maps a value onto a severity by direct threshold comparison.
///
/// Values exactly at a threshold belong to the worse bucket. The mapping is
/// total: NaN compares false against every threshold and lands in `Normal`.
pub fn classify(value: f64, spec: &MetricSpec) -> Severity {
    let (warning, critical) = (spec.warning_threshold, spec.critical_threshold);
    match spec.comparison {
        Comparison::GreaterThan if value >= critical => Severity::Critical,
        Comparison::GreaterThan if value >= warning => Severity::Warning,
        Comparison::LessThan if value <= critical => Severity::Critical,
        Comparison::LessThan if value <= warning => Severity::Warning,
        _ => Severity::Normal,
    }
}

/// Per-metric state machine over `Normal`, `Warning` and `Critical`
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    spec: MetricSpec,
    unknown_after: u32,
    state: EvaluatorState,
}

impl ThresholdEvaluator {
    pub fn new(spec: MetricSpec, unknown_after: u32) -> Self {
        Self { spec, unknown_after: unknown_after.max(1), state: EvaluatorState::default() }
    }

    pub fn spec(&self) -> &MetricSpec {
        &self.spec
    }

    pub fn state(&self) -> &EvaluatorState {
        &self.state
    }

    pub fn current_severity(&self) -> Severity {
        self.state.current_severity
    }

    /// Feeds one evaluated value.
    ///
    /// Returns a `Restored` event first if the metric was Unknown, then a
    /// `Transition` event if this sample completed a debounce run.
    pub fn tick(&mut self, value: f64, timestamp: SystemTime) -> Vec<EvaluatorEvent> {
        let mut events = Vec::new();

        if self.state.unknown {
            events.push(EvaluatorEvent::Restored(RestoredEvent {
                metric: self.spec.id.clone(),
                missed_ticks: self.state.consecutive_unavailable,
                timestamp,
            }));
            self.state.unknown = false;
        }
        self.state.consecutive_unavailable = 0;

        let raw = classify(value, &self.spec);
        if raw == self.state.candidate_severity {
            self.state.consecutive_count = self.state.consecutive_count.saturating_add(1);
        } else {
            self.state.candidate_severity = raw;
            self.state.consecutive_count = 1;
        }

        let candidate = self.state.candidate_severity;
        let current = self.state.current_severity;
        if candidate != current && self.state.consecutive_count >= self.required_count(current, candidate) {
            self.state.current_severity = candidate;
            self.state.last_transition = Some(timestamp);
            events.push(EvaluatorEvent::Transition(TransitionEvent {
                metric: self.spec.id.clone(),
                old_severity: current,
                new_severity: candidate,
                value,
                timestamp,
            }));
        }

        events
    }

    /// Records a tick on which no reading was available.
    ///
    /// Returns the Unknown notification on exactly the tick the outage
    /// reaches `unknown_after`.
    pub fn tick_unavailable(&mut self, reason: &str, timestamp: SystemTime) -> Option<EvaluatorEvent> {
        self.state.consecutive_unavailable = self.state.consecutive_unavailable.saturating_add(1);
        if self.state.unknown || self.state.consecutive_unavailable < self.unknown_after {
            return None;
        }
        self.state.unknown = true;
        Some(EvaluatorEvent::Unknown(UnknownEvent {
            metric: self.spec.id.clone(),
            last_severity: self.state.current_severity,
            consecutive_unavailable: self.state.consecutive_unavailable,
            reason: reason.to_string(),
            timestamp,
        }))
    }

    fn required_count(&self, current: Severity, candidate: Severity) -> u32 {
        if candidate > current {
            self.spec.escalation_debounce()
        } else {
            self.spec.recovery_debounce()
        }
    }
}
