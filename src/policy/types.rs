use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::core::metrics::{serialize_epoch_millis, ProcessInfo};
use crate::core::types::MetricId;

/// Corrective action a metric may be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectiveKind {
    /// Renice the heaviest non-whitelisted processes
    LowerPriority,
    /// Ask the kernel to drop reclaimable caches
    ReclaimMemory,
}

/// Kind of an [`ActionRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Log,
    Notify,
    LowerPriority,
    ReclaimMemory,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Log => "log",
            ActionKind::Notify => "notify",
            ActionKind::LowerPriority => "lower_priority",
            ActionKind::ReclaimMemory => "reclaim_memory",
        }
    }

    pub fn is_corrective(&self) -> bool {
        matches!(self, ActionKind::LowerPriority | ActionKind::ReclaimMemory)
    }
}

impl From<CorrectiveKind> for ActionKind {
    fn from(kind: CorrectiveKind) -> Self {
        match kind {
            CorrectiveKind::LowerPriority => ActionKind::LowerPriority,
            CorrectiveKind::ReclaimMemory => ActionKind::ReclaimMemory,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ActionResult {
    Success,
    /// The action was attempted and failed
    Failed(String),
    /// The action was not attempted (disabled, cooldown, not approved)
    Skipped(String),
    /// The target is protected by the whitelist
    Blocked(String),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success)
    }
}

/// Append-only audit entry for one action decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    /// Metric whose transition caused the action
    pub metric: MetricId,
    /// Metric id, process name (with pid) or `host`
    pub target: String,
    pub detail: String,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
    pub result: ActionResult,
}

/// What the policy knows about the tick that produced a transition
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Mean of the readings preceding the transition sample
    pub trailing_average: Option<f64>,
    /// Process table snapshot of the same tick, if one was taken
    pub processes: Option<Arc<[ProcessInfo]>>,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trailing_average(mut self, average: Option<f64>) -> Self {
        self.trailing_average = average;
        self
    }

    pub fn with_processes(mut self, processes: Option<Arc<[ProcessInfo]>>) -> Self {
        self.processes = processes;
        self
    }
}

/// Verdict of an [`crate::traits::OptimizationScorer`]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationScore {
    pub score: f64,
    pub approve: bool,
    pub rationale: String,
}

impl OptimizationScore {
    pub fn approve(score: f64, rationale: impl Into<String>) -> Self {
        Self { score, approve: true, rationale: rationale.into() }
    }

    pub fn reject(score: f64, rationale: impl Into<String>) -> Self {
        Self { score, approve: false, rationale: rationale.into() }
    }
}
