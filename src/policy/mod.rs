//! Action policy
//!
//! Decides what happens when a metric's committed severity changes. Every
//! transition is logged. Escalations additionally produce a notification when
//! enabled, and an escalation to Critical may trigger the metric's corrective
//! action, subject to three gates that are never bypassed, not even in
//! aggressive mode:
//!
//! - the corrective action must be enabled in configuration (all are off by default)
//! - the target must not be on the whitelist (exact, case-insensitive)
//! - the cooldown since the last attempt on the same target must have elapsed
//!
//! Decisions and executor calls are separate steps: `plan_*` builds an
//! [`ActionPlan`] without touching the host, and running the plan calls the
//! [`ActionExecutor`]. Executor failures become [`ActionResult::Failed`]
//! records; nothing here returns an error to the caller.

mod executor;
mod plan;
mod scoring;
mod types;


pub use executor::SystemActionExecutor;
pub use plan::ActionPlan;
pub use scoring::{SpikeScorer, ThresholdScorer};
pub use types::*;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::config::{ActionConfig, MonitorConfig, Whitelist};
use crate::core::metrics::ProcessInfo;
use crate::core::types::{MetricId, Resource, Severity};
use crate::evaluator::{TransitionEvent, UnknownEvent};
use crate::traits::{ActionExecutor, OptimizationScorer};
use plan::ActionTask;

/// Number of records kept in the in-memory audit log
const AUDIT_LOG_CAPACITY: usize = 1024;
const HOST_TARGET: &str = "host";

/// Turns severity transitions into [`ActionRecord`]s
pub struct ActionPolicy {
    config: ActionConfig,
    whitelist: Whitelist,
    correctives: HashMap<MetricId, CorrectiveKind>,
    scorer: Box<dyn OptimizationScorer>,
    executor: Arc<dyn ActionExecutor>,
    // last attempt per (action, lowercased target)
    cooldowns: HashMap<(ActionKind, String), SystemTime>,
    audit: VecDeque<ActionRecord>,
}

impl std::fmt::Debug for ActionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionPolicy")
            .field("config", &self.config)
            .field("correctives", &self.correctives)
            .field("cooldowns", &self.cooldowns.len())
            .finish_non_exhaustive()
    }
}

impl ActionPolicy {
    /// Creates a policy with the threshold scorer and the system executor
    pub fn new(config: ActionConfig) -> Self {
        Self {
            whitelist: config.whitelist(),
            config,
            correctives: HashMap::new(),
            scorer: Box::new(ThresholdScorer),
            executor: Arc::new(SystemActionExecutor::new()),
            cooldowns: HashMap::new(),
            audit: VecDeque::new(),
        }
    }

    /// Creates a policy with the corrective actions of every configured metric
    pub fn from_config(config: &MonitorConfig) -> Self {
        config
            .metrics
            .iter()
            .filter_map(|spec| spec.corrective.map(|kind| (spec.id.clone(), kind)))
            .fold(Self::new(config.actions.clone()), |policy, (id, kind)| policy.with_corrective(id, kind))
    }

    pub fn with_corrective(mut self, metric: impl Into<MetricId>, kind: CorrectiveKind) -> Self {
        self.correctives.insert(metric.into(), kind);
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn OptimizationScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_executor(mut self, executor: Box<dyn ActionExecutor>) -> Self {
        self.executor = Arc::from(executor);
        self
    }

    /// Executor that runs the corrective steps of this policy's plans
    pub fn executor(&self) -> Arc<dyn ActionExecutor> {
        Arc::clone(&self.executor)
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Most recent audit records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &ActionRecord> {
        self.audit.iter()
    }

    /// Handles a committed severity transition, running any corrective
    /// action on the calling thread
    pub fn on_transition(&mut self, transition: &TransitionEvent, context: &ActionContext) -> Vec<ActionRecord> {
        let plan = self.plan_transition(transition, context);
        let records = plan.run(self.executor.as_ref());
        self.commit(records)
    }

    /// Handles a metric becoming Unknown after repeated unavailable ticks
    pub fn on_unknown(&mut self, event: &UnknownEvent) -> Vec<ActionRecord> {
        let records = self.plan_unknown(event).run(self.executor.as_ref());
        self.commit(records)
    }

    /// Decides what a committed transition triggers.
    ///
    /// Cooldowns are stamped here, so a second plan for the same target
    /// within the window is skipped even before the first one has run.
    pub fn plan_transition(&mut self, transition: &TransitionEvent, context: &ActionContext) -> ActionPlan {
        let metric = &transition.metric;
        let at = transition.timestamp;
        let mut plan = ActionPlan::default();

        let detail = format!(
            "{} -> {} at {:.2}",
            transition.old_severity, transition.new_severity, transition.value
        );
        if transition.is_recovery() {
            info!(metric = %metric, from = %transition.old_severity, to = %transition.new_severity, "Recovered");
            plan.push(self.record(ActionKind::Log, metric, metric.as_str(), format!("recovered: {detail}"), at, ActionResult::Success));
            return plan;
        }

        plan.push(self.record(ActionKind::Log, metric, metric.as_str(), detail.clone(), at, ActionResult::Success));
        if self.config.notify {
            plan.push(self.record(ActionKind::Notify, metric, metric.as_str(), detail, at, ActionResult::Success));
        }

        if transition.new_severity == Severity::Critical {
            if let Some(kind) = self.correctives.get(metric).copied() {
                self.corrective(&mut plan, kind, transition, context);
            }
        }
        plan
    }

    /// Decides what an Unknown notification triggers; never corrective
    pub fn plan_unknown(&mut self, event: &UnknownEvent) -> ActionPlan {
        let detail = format!("no readings for {} ticks: {}", event.consecutive_unavailable, event.reason);
        let mut plan = ActionPlan::default();
        plan.push(self.record(ActionKind::Log, &event.metric, event.metric.as_str(), detail.clone(), event.timestamp, ActionResult::Success));
        if self.config.notify {
            plan.push(self.record(ActionKind::Notify, &event.metric, event.metric.as_str(), detail, event.timestamp, ActionResult::Success));
        }
        plan
    }

    fn corrective(&mut self, plan: &mut ActionPlan, kind: CorrectiveKind, transition: &TransitionEvent, context: &ActionContext) {
        let action = ActionKind::from(kind);
        let metric = &transition.metric;
        let at = transition.timestamp;

        if !self.config.is_enabled(kind) {
            plan.push(self.record(action, metric, "-", "", at, ActionResult::Skipped("disabled in configuration".into())));
            return;
        }

        let verdict = self.scorer.score(transition, context);
        if !verdict.approve {
            plan.push(self.record(action, metric, "-", "", at, ActionResult::Skipped(verdict.rationale)));
            return;
        }

        match kind {
            CorrectiveKind::ReclaimMemory => self.reclaim_memory(plan, metric, at),
            CorrectiveKind::LowerPriority => self.lower_priority(plan, metric, at, context),
        }
    }

    fn reclaim_memory(&mut self, plan: &mut ActionPlan, metric: &MetricId, at: SystemTime) {
        let action = ActionKind::ReclaimMemory;
        if let Some(remaining) = self.cooldown_remaining(action, HOST_TARGET, at) {
            plan.push(self.record(action, metric, HOST_TARGET, "", at, cooldown_skip(remaining)));
            return;
        }
        self.stamp(action, HOST_TARGET, at);
        plan.push_pending(self.record(action, metric, HOST_TARGET, "", at, not_run()), ActionTask::ReclaimMemory);
    }

    fn lower_priority(&mut self, plan: &mut ActionPlan, metric: &MetricId, at: SystemTime, context: &ActionContext) {
        let action = ActionKind::LowerPriority;
        let Some(processes) = context.processes.as_deref() else {
            plan.push(self.record(action, metric, "-", "", at, ActionResult::Skipped("no process snapshot this tick".into())));
            return;
        };

        let by_memory = metric.resource_prefix() == Resource::Memory.as_str();
        let own_pid = std::process::id();
        let mut candidates: Vec<&ProcessInfo> = processes.iter().filter(|p| p.pid != own_pid && p.pid > 1).collect();
        candidates.sort_by(|a, b| {
            let (x, y) = if by_memory { (a.memory_mb, b.memory_mb) } else { (a.cpu_percent, b.cpu_percent) };
            y.total_cmp(&x)
        });
        candidates.truncate(self.config.max_targets);

        let before = plan.len();
        for process in candidates {
            let target = format!("{} ({})", process.name, process.pid);
            let detail = format!("cpu {:.1}%, memory {:.0} MB", process.cpu_percent, process.memory_mb);

            if self.whitelist.contains(&process.name) {
                plan.push(self.record(action, metric, &target, detail, at, ActionResult::Blocked("whitelisted".into())));
                continue;
            }
            if let Some(remaining) = self.cooldown_remaining(action, &process.name, at) {
                plan.push(self.record(action, metric, &target, detail, at, cooldown_skip(remaining)));
                continue;
            }

            self.stamp(action, &process.name, at);
            let task = ActionTask::LowerPriority { pid: process.pid, increment: self.config.nice_increment };
            plan.push_pending(self.record(action, metric, &target, detail, at, not_run()), task);
            if !self.config.aggressive {
                break;
            }
        }

        if plan.len() == before {
            plan.push(self.record(action, metric, "-", "", at, ActionResult::Skipped("no candidate processes".into())));
        }
    }

    fn cooldown_remaining(&self, action: ActionKind, target: &str, at: SystemTime) -> Option<Duration> {
        let last = self.cooldowns.get(&(action, target.to_lowercase()))?;
        let elapsed = at.duration_since(*last).unwrap_or(Duration::ZERO);
        self.config.cooldown().checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    fn stamp(&mut self, action: ActionKind, target: &str, at: SystemTime) {
        self.cooldowns.insert((action, target.to_lowercase()), at);
    }

    fn record(
        &self,
        kind: ActionKind,
        metric: &MetricId,
        target: &str,
        detail: impl Into<String>,
        timestamp: SystemTime,
        result: ActionResult,
    ) -> ActionRecord {
        ActionRecord { kind, metric: metric.clone(), target: target.to_string(), detail: detail.into(), timestamp, result }
    }

    /// Appends the outcome of a plan to the audit log
    pub fn commit(&mut self, records: Vec<ActionRecord>) -> Vec<ActionRecord> {
        for record in &records {
            if let ActionResult::Blocked(reason) = &record.result {
                warn!(metric = %record.metric, subject = %record.target, reason = %reason, "Corrective action blocked");
            }
            if self.audit.len() == AUDIT_LOG_CAPACITY {
                self.audit.pop_front();
            }
            self.audit.push_back(record.clone());
        }
        records
    }
}

fn not_run() -> ActionResult {
    ActionResult::Skipped("not executed".into())
}

fn cooldown_skip(remaining: Duration) -> ActionResult {
    ActionResult::Skipped(format!("cooldown, {}s remaining", remaining.as_secs()))
}
