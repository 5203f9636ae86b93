use crate::error::Result;
use crate::evaluator::TransitionEvent;
use crate::policy::{ActionContext, OptimizationScore};

/// Performs corrective actions on the host.
///
/// Implementations report every failure as `Error::ActionFailed`; the policy
/// turns that into a failed `ActionRecord` and never propagates it.
#[cfg_attr(test, mockall::automock)]
pub trait ActionExecutor: Send + Sync {
    /// Lower the scheduling priority of `pid` by `increment` nice steps
    fn lower_priority(&self, pid: u32, increment: i32) -> Result<()>;

    /// Ask the kernel to release reclaimable memory
    fn reclaim_memory(&self) -> Result<()>;
}

/// Decides whether a Critical escalation is worth a corrective action.
///
/// The default is [`crate::policy::ThresholdScorer`], which approves every
/// escalation the thresholds produced.
pub trait OptimizationScorer: Send + Sync {
    fn score(&self, transition: &TransitionEvent, context: &ActionContext) -> OptimizationScore;
}
