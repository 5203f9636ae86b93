//! The monitor aggregate
//!
//! [`MonitorCore`] owns every piece of per-metric state: one
//! [`ThresholdEvaluator`] and one [`HistoryBuffer`] per configured metric, the
//! [`ActionPolicy`] and the sink. It is built once at startup from a
//! validated [`MonitorConfig`] and shared by handle with the sample loop and
//! any status reader.
//!
//! Each metric's evaluator and history sit behind their own mutex, so a
//! metric is only ever evaluated by one caller at a time. After evaluating,
//! the metric publishes a fresh [`MetricSnapshot`] by swapping an `Arc`, and
//! [`MonitorCore::status`] only clones those `Arc`s.
//!
//! Corrective actions are decided under the policy lock but executed on the
//! blocking pool after the lock is released, so a slow executor call never
//! stalls the runtime or other metrics' evaluation.

mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace};

use crate::config::{EvaluationBasis, MetricSpec, MonitorConfig};
use crate::core::metrics::{ProcessInfo, Reading};
use crate::core::types::{MetricId, Resource};
use crate::error::Result;
use crate::evaluator::{EvaluatorEvent, ThresholdEvaluator};
use crate::history::HistoryBuffer;
use crate::policy::{ActionContext, ActionPlan, ActionPolicy, ActionRecord};
use crate::sink::{BackendChange, SinkEvent};
use crate::source::Sample;
use crate::traits::Sink;

#[derive(Debug)]
struct SlotState {
    evaluator: ThresholdEvaluator,
    history: HistoryBuffer,
    backend: Option<String>,
    degraded: bool,
}

impl SlotState {
    fn snapshot(&self) -> MetricSnapshot {
        let state = self.evaluator.state();
        MetricSnapshot {
            spec: self.evaluator.spec().clone(),
            severity: state.current_severity,
            unknown: state.unknown,
            latest: self.history.latest().cloned(),
            average: self.history.average(None),
            min: self.history.min(),
            max: self.history.max(),
            history_len: self.history.len(),
            backend: self.backend.clone(),
            degraded: self.degraded,
            last_transition: state.last_transition,
        }
    }
}

#[derive(Debug)]
struct MetricSlot {
    state: Mutex<SlotState>,
    snapshot: RwLock<Arc<MetricSnapshot>>,
}

impl MetricSlot {
    fn new(spec: &MetricSpec, config: &MonitorConfig) -> Self {
        let state = SlotState {
            evaluator: ThresholdEvaluator::new(spec.clone(), config.unknown_after),
            history: HistoryBuffer::new(config.capacity_for(spec)),
            backend: None,
            degraded: false,
        };
        Self { state: Mutex::new(state), snapshot: RwLock::new(Arc::new(MetricSnapshot::empty(spec.clone()))) }
    }

    fn publish(&self, state: &SlotState) {
        *self.snapshot.write() = Arc::new(state.snapshot());
    }
}

/// All evaluators, histories and the action policy of one sampler
pub struct MonitorCore {
    config: MonitorConfig,
    slots: Vec<MetricSlot>,
    index: HashMap<MetricId, usize>,
    policy: Mutex<ActionPolicy>,
    sink: Arc<dyn Sink>,
}

impl std::fmt::Debug for MonitorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorCore")
            .field("metrics", &self.index.keys().collect::<Vec<_>>())
            .field("policy", &*self.policy.lock())
            .finish_non_exhaustive()
    }
}

impl MonitorCore {
    /// Validates `config` and builds the per-metric state.
    ///
    /// Returns `Error::ConfigInvalid` without building anything when a metric
    /// spec or global setting is inconsistent.
    pub fn new(config: MonitorConfig, sink: Arc<dyn Sink>) -> Result<Self> {
        config.validate()?;
        let policy = ActionPolicy::from_config(&config);
        let slots: Vec<MetricSlot> = config.metrics.iter().map(|spec| MetricSlot::new(spec, &config)).collect();
        let index = config.metrics.iter().enumerate().map(|(i, spec)| (spec.id.clone(), i)).collect();
        debug!(metrics = slots.len(), "Monitor core initialized");
        Ok(Self { config, slots, index, policy: Mutex::new(policy), sink })
    }

    /// Replaces the action policy, e.g. with a custom scorer or executor
    pub fn with_policy(self, policy: ActionPolicy) -> Self {
        *self.policy.lock() = policy;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn is_configured(&self, metric: &MetricId) -> bool {
        self.index.contains_key(metric)
    }

    pub fn metric_ids(&self) -> impl Iterator<Item = &MetricId> {
        self.config.metrics.iter().map(|spec| &spec.id)
    }

    /// Latest published snapshot of one metric
    pub fn snapshot(&self, metric: &MetricId) -> Option<Arc<MetricSnapshot>> {
        let slot = self.slots.get(*self.index.get(metric)?)?;
        let snapshot = slot.snapshot.read().clone();
        Some(snapshot)
    }

    /// Snapshots of every metric; never waits for an evaluation to finish
    pub fn status(&self) -> StatusReport {
        StatusReport {
            generated_at: SystemTime::now(),
            metrics: self.slots.iter().map(|slot| slot.snapshot.read().clone()).collect(),
        }
    }

    /// Copy of the policy's in-memory audit log
    pub fn action_log(&self) -> Vec<ActionRecord> {
        self.policy.lock().records().cloned().collect()
    }

    /// Evaluates every configured metric of a successful source sample.
    ///
    /// Described metrics the backend did not report count as unavailable for
    /// this tick. `processes` is the tick's process table, handed to the
    /// action policy when a transition needs a target.
    pub async fn evaluate_sample(
        &self,
        resource: Resource,
        sample: &Sample,
        processes: Option<&Arc<[ProcessInfo]>>,
    ) -> EvaluationCounts {
        let mut counts = EvaluationCounts::default();

        if let Some(switch) = &sample.switch {
            let change = BackendChange::new(resource, switch, sample.timestamp);
            self.sink.emit(&if switch.degraded {
                SinkEvent::BackendDegraded(change)
            } else {
                SinkEvent::BackendRestored(change)
            });
        }

        for reading in &sample.readings {
            if self.config.emit_readings {
                self.sink.emit(&SinkEvent::Reading(reading.clone()));
            }
            counts += self.evaluate_reading(reading, sample.degraded, processes).await;
        }

        let reason = format!("not reported by {}", sample.backend);
        counts += self.mark_unavailable(sample.missing.iter(), &reason, sample.timestamp).await;
        counts
    }

    /// Evaluates one reading of a configured metric
    pub async fn evaluate_reading(
        &self,
        reading: &Reading,
        degraded: bool,
        processes: Option<&Arc<[ProcessInfo]>>,
    ) -> EvaluationCounts {
        let Some(slot) = self.index.get(&reading.metric).and_then(|&i| self.slots.get(i)) else {
            trace!(metric = %reading.metric, "Reading for unconfigured metric");
            return EvaluationCounts::default();
        };

        let (events, trailing_average) = {
            let mut state = slot.state.lock();
            let trailing_average = state.history.average(None);
            state.history.push(reading.clone());
            let value = match state.evaluator.spec().evaluate_on {
                EvaluationBasis::Current => reading.value,
                EvaluationBasis::Average(window) => state.history.average(Some(window)).unwrap_or(reading.value),
            };
            let events = state.evaluator.tick(value, reading.timestamp);
            state.backend = Some(reading.backend.clone());
            state.degraded = degraded;
            slot.publish(&state);
            (events, trailing_average)
        };
        trace!(metric = %reading.metric, value = reading.value, "Evaluated");

        let context = ActionContext::new()
            .with_trailing_average(trailing_average)
            .with_processes(processes.cloned());
        let mut counts = EvaluationCounts { readings: 1, ..Default::default() };
        counts += self.dispatch(events, &context).await;
        counts
    }

    /// Records a tick without readings for the given metrics.
    ///
    /// Metrics that are not configured are ignored.
    pub async fn mark_unavailable<'a, I>(&self, metrics: I, reason: &str, timestamp: SystemTime) -> EvaluationCounts
    where
        I: IntoIterator<Item = &'a MetricId>,
    {
        let mut counts = EvaluationCounts::default();
        for metric in metrics {
            let Some(slot) = self.index.get(metric).and_then(|&i| self.slots.get(i)) else {
                continue;
            };
            let event = {
                let mut state = slot.state.lock();
                let event = state.evaluator.tick_unavailable(reason, timestamp);
                slot.publish(&state);
                event
            };
            counts.unavailable += 1;
            counts += self.dispatch(event.into_iter().collect(), &ActionContext::new()).await;
        }
        counts
    }

    async fn dispatch(&self, events: Vec<EvaluatorEvent>, context: &ActionContext) -> EvaluationCounts {
        let mut counts = EvaluationCounts::default();
        for event in events {
            let plan = match event {
                EvaluatorEvent::Transition(transition) => {
                    counts.transitions += 1;
                    self.sink.emit(&SinkEvent::Transition(transition.clone()));
                    self.policy.lock().plan_transition(&transition, context)
                }
                EvaluatorEvent::Unknown(unknown) => {
                    self.sink.emit(&SinkEvent::Unknown(unknown.clone()));
                    self.policy.lock().plan_unknown(&unknown)
                }
                EvaluatorEvent::Restored(restored) => {
                    self.sink.emit(&SinkEvent::Restored(restored));
                    ActionPlan::default()
                }
            };
            let records = self.execute(plan).await;
            counts.actions += records.len();
            for record in records {
                self.sink.emit(&SinkEvent::Action(record));
            }
        }
        counts
    }

    async fn execute(&self, plan: ActionPlan) -> Vec<ActionRecord> {
        if plan.is_empty() {
            return Vec::new();
        }
        let executor = self.policy.lock().executor();
        let records = if plan.has_pending() {
            match tokio::task::spawn_blocking(move || plan.run(executor.as_ref())).await {
                Ok(records) => records,
                Err(e) => {
                    error!(error = %e, "Corrective action task did not complete");
                    return Vec::new();
                }
            }
        } else {
            plan.run(executor.as_ref())
        };
        self.policy.lock().commit(records)
    }
}
