//! host-sentinel - single-host telemetry sampling and threshold alerting
//!
//! This crate periodically samples CPU, memory, GPU, disk, network and
//! process metrics, compares every reading against configured thresholds
//! with debounced hysteresis, keeps a rolling history per metric and emits
//! alert events and optional corrective actions.
//!
//! # Features
//!
//! - **Fallback chains**: every resource is served by an ordered list of
//!   backends (vendor CLI, `/proc` or sysfs file, generic library) and
//!   silently falls through to the next one when a backend times out, is
//!   missing or fails
//! - **Debounced severities**: a metric only changes between `Normal`,
//!   `Warning` and `Critical` after a configurable run of agreeing samples,
//!   with optional asymmetric recovery
//! - **Unknown detection**: a metric without readings for `unknown_after`
//!   ticks is reported once as Unknown
//! - **Rate-limited actions**: corrective actions are opt-in, never touch
//!   whitelisted processes and respect a per-target cooldown
//! - **Snapshots**: status queries read immutable per-metric snapshots and
//!   never wait for a running tick
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use host_sentinel::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = MonitorConfig::default();
//!     let registry = SourceRegistry::with_defaults(&config);
//!     let core = Arc::new(MonitorCore::new(config, Arc::new(TracingSink))?);
//!
//!     let sample_loop = SampleLoop::new(Arc::clone(&core), registry);
//!     let report = sample_loop.tick().await;
//!     println!("sampled {} sources", report.sources_sampled);
//!
//!     for metric in core.status().metrics {
//!         println!("{}: {}", metric.id(), metric.severity);
//!     }
//!
//!     let cancel = CancellationToken::new();
//!     cancel.cancel();
//!     sample_loop.run(cancel).await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Steady-state failures never surface as errors from the loop: an exhausted
//! backend chain becomes an unavailable tick for that resource, and a failed
//! corrective action becomes an [`policy::ActionResult::Failed`] record. Only
//! configuration problems are fatal:
//!
//! ```rust
//! use host_sentinel::config::{MetricSpec, MonitorConfig};
//! use host_sentinel::core::types::Unit;
//! use host_sentinel::Error;
//!
//! let config = MonitorConfig {
//!     metrics: vec![MetricSpec::new("cpu.usage", 98.0, 85.0, Unit::Percent)],
//!     ..MonitorConfig::default()
//! };
//! assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod monitor;
pub mod policy;
pub mod sampler;
pub mod sink;
pub mod source;
pub mod traits;

// Resource backends
pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod network;
pub mod process;

// Private modules
mod utils;

pub use error::{BackendError, BackendResult, Error, Result};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::config::{ActionConfig, EvaluationBasis, MetricSpec, MonitorConfig, Whitelist};
    pub use crate::core::prelude::*;
    pub use crate::error::{BackendError, Error, Result};
    pub use crate::evaluator::{classify, EvaluatorEvent, ThresholdEvaluator, TransitionEvent};
    pub use crate::history::HistoryBuffer;
    pub use crate::monitor::{MetricSnapshot, MonitorCore, StatusReport};
    pub use crate::policy::{ActionKind, ActionPlan, ActionPolicy, ActionRecord, ActionResult, SpikeScorer, ThresholdScorer};
    pub use crate::sampler::{LoopHandle, LoopState, SampleLoop, TickReport};
    pub use crate::sink::{BroadcastSink, CollectingSink, FanoutSink, JsonLinesSink, SinkEvent, TracingSink};
    pub use crate::source::{FallbackSource, RawSample, Sample, SourceRegistry};
    pub use crate::traits::{ActionExecutor, MetricBackend, MetricSource, OptimizationScorer, Sink};
}
