use std::time::Duration;

use async_trait::async_trait;

use crate::core::metrics::Reading;
use crate::core::types::{MetricId, Resource};
use crate::error::{BackendResult, Error, Result};
use crate::source::{MetricDescriptor, RawSample, Sample};

/// One way of obtaining a resource's readings (a CLI tool, a `/proc` file,
/// a vendor library).
///
/// Backends are platform specific and are always called under a timeout by
/// the owning source, so an implementation may block on IO as long as it
/// does so inside `spawn_blocking` or an async call.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use host_sentinel::error::BackendResult;
/// use host_sentinel::source::RawSample;
/// use host_sentinel::traits::MetricBackend;
///
/// struct Constant;
///
/// #[async_trait]
/// impl MetricBackend for Constant {
///     fn name(&self) -> &str {
///         "constant"
///     }
///
///     async fn probe(&self) -> bool {
///         true
///     }
///
///     async fn sample(&self) -> BackendResult<RawSample> {
///         Ok(RawSample::new().with_value("cpu.usage", 12.0))
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricBackend: Send + Sync {
    /// Stable name used in readings and logs
    fn name(&self) -> &str;

    /// Whether this backend is usable right now
    async fn probe(&self) -> bool;

    /// Read the current values
    async fn sample(&self) -> BackendResult<RawSample>;
}

/// Produces readings for one resource, hiding which backend served them.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// The resource this source samples
    fn resource(&self) -> Resource;

    /// The metrics a successful sample may contain
    fn descriptors(&self) -> &[MetricDescriptor];

    /// Sample every metric of this source in one backend pass.
    ///
    /// Returns `Error::MetricUnavailable` when no backend could serve the
    /// request. That outcome is expected and non-fatal.
    async fn sample(&self) -> Result<Sample>;

    /// Whether the source is currently served by a non-primary backend
    fn is_degraded(&self) -> bool;

    /// Longest a single `sample` call may take when every backend hangs.
    ///
    /// `None` lets the caller fall back to its own limit.
    fn max_duration(&self) -> Option<Duration> {
        None
    }

    /// Sample a single metric of this source
    async fn sample_metric(&self, metric: &MetricId) -> Result<Reading> {
        let sample = self.sample().await?;
        sample
            .readings
            .into_iter()
            .find(|r| &r.metric == metric)
            .ok_or_else(|| Error::metric_unavailable(metric.as_str(), "not reported by the active backend"))
    }
}
