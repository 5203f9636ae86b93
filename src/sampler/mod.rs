//! The sample loop
//!
//! One tick samples every registered source concurrently, waits for all of
//! them (each bounded by its own outer timeout), then evaluates the results
//! one source at a time through the [`MonitorCore`]. The loop moves through
//! `Idle -> Sampling -> Evaluating -> Idle` on every tick it does not skip.
//!
//! [`SampleLoop::run`] drives ticks on a fixed interval until its
//! cancellation token fires; a tick that already started always finishes,
//! so no evaluator state is left half committed.

mod types;


pub use types::*;

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::metrics::ProcessInfo;
use crate::error::Error;
use crate::monitor::{EvaluationCounts, MonitorCore};
use crate::source::{Sample, SourceRegistry};
use crate::traits::MetricSource;

/// Slack added to a source's own backend timeouts before the outer timeout fires
pub const OUTER_TIMEOUT_MARGIN: Duration = Duration::from_millis(500);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic driver of sampling and evaluation
pub struct SampleLoop {
    core: Arc<MonitorCore>,
    registry: SourceRegistry,
    interval: Duration,
    backend_timeout: Duration,
    handle: LoopHandle,
}

impl std::fmt::Debug for SampleLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoop")
            .field("registry", &self.registry)
            .field("interval", &self.interval)
            .field("state", &self.handle.state())
            .finish_non_exhaustive()
    }
}

impl SampleLoop {
    pub fn new(core: Arc<MonitorCore>, registry: SourceRegistry) -> Self {
        let config = core.config();
        for metric in config.metrics.iter().map(|spec| &spec.id) {
            if !registry.provides(metric) {
                warn!(metric = %metric, "No registered source provides this metric");
            }
        }
        Self {
            interval: config.interval(),
            backend_timeout: config.backend_timeout(),
            core,
            registry,
            handle: LoopHandle::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn core(&self) -> &Arc<MonitorCore> {
        &self.core
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The source's own worst case plus a margin, or twice the configured
    /// backend timeout for sources that do not report one
    pub(crate) fn outer_timeout(&self, source: &dyn MetricSource) -> Duration {
        source.max_duration().unwrap_or(self.backend_timeout * 2) + OUTER_TIMEOUT_MARGIN
    }

    /// Runs one sampling and evaluation pass, unless paused
    pub async fn tick(&self) -> TickReport {
        let started_at = SystemTime::now();
        if self.handle.is_paused() {
            debug!("Sample loop paused, skipping tick");
            return TickReport::skipped(started_at);
        }
        let clock = Instant::now();

        self.handle.set_state(LoopState::Sampling);
        let handle = scopeguard::guard(self.handle.clone(), |handle| handle.set_state(LoopState::Idle));

        let results = join_all(self.registry.sources().iter().map(|source| async move {
            let limit = self.outer_timeout(&**source);
            let outcome = match tokio::time::timeout(limit, source.sample()).await {
                Ok(result) => result,
                Err(_) => Err(Error::metric_unavailable(
                    source.resource().as_str(),
                    format!("source did not finish within {limit:?}"),
                )),
            };
            (source, outcome)
        }))
        .await;

        handle.set_state(LoopState::Evaluating);
        let processes: Option<Arc<[ProcessInfo]>> = results
            .iter()
            .find_map(|(_, outcome)| outcome.as_ref().ok().and_then(|sample: &Sample| sample.processes.clone()));

        let (mut sampled, mut unavailable) = (0, 0);
        let mut counts = EvaluationCounts::default();
        for (source, outcome) in &results {
            match outcome {
                Ok(sample) => {
                    sampled += 1;
                    counts += self.core.evaluate_sample(source.resource(), sample, processes.as_ref()).await;
                }
                Err(e) => {
                    unavailable += 1;
                    debug!(resource = %source.resource(), error = %e, "Source unavailable this tick");
                    let metrics: Vec<_> = source.descriptors().iter().map(|d| &d.id).collect();
                    counts += self.core.mark_unavailable(metrics, &e.to_string(), SystemTime::now()).await;
                }
            }
        }

        let report = TickReport {
            started_at,
            duration: clock.elapsed(),
            skipped: false,
            sources_sampled: sampled,
            sources_unavailable: unavailable,
            counts,
        };
        debug!(
            sampled,
            unavailable,
            transitions = counts.transitions,
            actions = counts.actions,
            elapsed_ms = report.duration.as_millis() as u64,
            "Tick complete"
        );
        report
    }

    /// Ticks on the configured interval until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = self.interval.as_millis() as u64, sources = self.registry.len(), "Sample loop started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        info!("Sample loop stopped");
    }

    /// Runs the loop on a background task
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
