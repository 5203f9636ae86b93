use crate::core::types::Severity;
use crate::evaluator::TransitionEvent;
use crate::policy::{ActionContext, OptimizationScore};
use crate::traits::OptimizationScorer;

/// Approves every escalation to Critical. The thresholds already did the work.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdScorer;

impl OptimizationScorer for ThresholdScorer {
    fn score(&self, transition: &TransitionEvent, _context: &ActionContext) -> OptimizationScore {
        if transition.new_severity == Severity::Critical && transition.is_escalation() {
            OptimizationScore::approve(1.0, "critical threshold crossed")
        } else {
            OptimizationScore::reject(0.0, format!("transition to {} is not critical", transition.new_severity))
        }
    }
}

/// Approves only sudden changes: the transition value must differ from the
/// trailing average by more than `delta` and exceed `floor`.
#[derive(Debug, Clone, Copy)]
pub struct SpikeScorer {
    pub delta: f64,
    pub floor: f64,
}

impl SpikeScorer {
    pub fn new(delta: f64, floor: f64) -> Self {
        Self { delta, floor }
    }
}

impl Default for SpikeScorer {
    fn default() -> Self {
        Self { delta: 30.0, floor: 60.0 }
    }
}

impl OptimizationScorer for SpikeScorer {
    fn score(&self, transition: &TransitionEvent, context: &ActionContext) -> OptimizationScore {
        let Some(average) = context.trailing_average else {
            return OptimizationScore::reject(0.0, "no history to compare against");
        };
        let change = (transition.value - average).abs();
        let score = if self.delta > 0.0 { change / self.delta } else { change };
        if change > self.delta && transition.value > self.floor {
            OptimizationScore::approve(score, format!("sudden change {average:.1} -> {:.1}", transition.value))
        } else {
            OptimizationScore::reject(score, format!("change of {change:.1} is within {:.1}", self.delta))
        }
    }
}
