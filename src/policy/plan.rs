use tracing::error;

use super::types::{ActionRecord, ActionResult};
use crate::traits::ActionExecutor;

/// Executor call the policy decided on but has not made yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActionTask {
    LowerPriority { pid: u32, increment: i32 },
    ReclaimMemory,
}

#[derive(Debug)]
enum Step {
    Done(ActionRecord),
    Pending { record: ActionRecord, task: ActionTask },
}

/// The records of one policy decision, in order.
///
/// A plan is built under the policy lock without touching the host. Records
/// of corrective actions stay pending until [`ActionPlan::run`] calls the
/// executor; that call may block, so async callers run it on the blocking
/// pool.
#[derive(Debug, Default)]
pub struct ActionPlan {
    steps: Vec<Step>,
}

impl ActionPlan {
    pub(crate) fn push(&mut self, record: ActionRecord) {
        self.steps.push(Step::Done(record));
    }

    pub(crate) fn push_pending(&mut self, record: ActionRecord, task: ActionTask) {
        self.steps.push(Step::Pending { record, task });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether running the plan calls the executor
    pub fn has_pending(&self) -> bool {
        self.steps.iter().any(|step| matches!(step, Step::Pending { .. }))
    }

    /// Makes the pending executor calls and returns every record
    pub fn run(self, executor: &dyn ActionExecutor) -> Vec<ActionRecord> {
        self.steps
            .into_iter()
            .map(|step| match step {
                Step::Done(record) => record,
                Step::Pending { mut record, task } => {
                    record.result = execute(task, executor, &record);
                    record
                }
            })
            .collect()
    }
}

fn execute(task: ActionTask, executor: &dyn ActionExecutor, record: &ActionRecord) -> ActionResult {
    let outcome = match task {
        ActionTask::LowerPriority { pid, increment } => executor.lower_priority(pid, increment),
        ActionTask::ReclaimMemory => executor.reclaim_memory(),
    };
    match outcome {
        Ok(()) => ActionResult::Success,
        Err(e) => {
            error!(metric = %record.metric, action = %record.kind, subject = %record.target, error = %e, "Corrective action failed");
            ActionResult::Failed(e.to_string())
        }
    }
}
