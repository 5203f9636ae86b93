//! Metric sources and backend fallback chains
//!
//! A [`FallbackSource`] owns an ordered list of [`MetricBackend`]s for one
//! resource. Each call walks the chain from the primary backend and returns
//! the first successful result. Backends are probed before their first use
//! and again after any failure, and every probe and sample runs under the
//! source's timeout, so a hung tool costs at most one timeout per backend.
//!
//! Exhausting the chain is not an error in the usual sense: the source
//! returns [`Error::MetricUnavailable`] and the caller skips that resource for
//! the tick. Backend switches are logged once per switch, not once per tick.

mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use registry::SourceRegistry;
pub use types::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::constants::DEFAULT_BACKEND_TIMEOUT_MS;
use crate::core::metrics::Reading;
use crate::core::types::Resource;
use crate::error::{BackendError, Error, Result};
use crate::traits::{MetricBackend, MetricSource};

struct BackendSlot {
    backend: Box<dyn MetricBackend>,
    // last probe or sample succeeded
    confirmed: AtomicBool,
}

#[derive(Debug, Default)]
struct ChainState {
    active: Option<usize>,
    started: bool,
    unavailable_logged: bool,
}

/// A source served by the first working backend of an ordered chain
pub struct FallbackSource {
    resource: Resource,
    descriptors: Vec<MetricDescriptor>,
    backends: Vec<BackendSlot>,
    timeout: Duration,
    state: Mutex<ChainState>,
}

impl std::fmt::Debug for FallbackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSource")
            .field("resource", &self.resource)
            .field("backends", &self.backend_names())
            .field("timeout", &self.timeout)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl FallbackSource {
    pub fn new(resource: Resource, descriptors: Vec<MetricDescriptor>) -> Self {
        Self {
            resource,
            descriptors,
            backends: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Appends a backend; the first one added is the primary
    pub fn with_backend(mut self, backend: impl MetricBackend + 'static) -> Self {
        self.push_backend(Box::new(backend));
        self
    }

    pub fn push_backend(&mut self, backend: Box<dyn MetricBackend>) {
        self.backends.push(BackendSlot { backend, confirmed: AtomicBool::new(false) });
    }

    /// Timeout applied to every probe and sample call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|slot| slot.backend.name()).collect()
    }

    /// Name of the backend that served the last successful sample
    pub fn active_backend(&self) -> Option<&str> {
        let index = self.state.lock().active?;
        self.backends.get(index).map(|slot| slot.backend.name())
    }

    async fn try_backend(&self, slot: &BackendSlot) -> std::result::Result<RawSample, String> {
        let backend = &slot.backend;
        if !slot.confirmed.load(Ordering::Acquire) {
            match tokio::time::timeout(self.timeout, backend.probe()).await {
                Ok(true) => {}
                Ok(false) => return Err("probe reported backend unusable".to_string()),
                Err(_) => return Err(format!("probe {}", BackendError::Timeout(self.timeout))),
            }
        }

        let outcome = match tokio::time::timeout(self.timeout, backend.sample()).await {
            Ok(Ok(raw)) => raw.check_finite().map(|()| raw),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        };
        slot.confirmed.store(outcome.is_ok(), Ordering::Release);
        outcome.map_err(|e| e.to_string())
    }

    fn finish(&self, index: usize, raw: RawSample) -> Sample {
        let backend = self.backends[index].backend.name().to_string();
        let timestamp = SystemTime::now();

        let mut readings = Vec::with_capacity(raw.values.len());
        for (metric, value) in raw.values {
            match self.descriptors.iter().find(|d| d.id == metric) {
                Some(descriptor) => {
                    readings.push(Reading::with_timestamp(metric, value, descriptor.unit, backend.as_str(), timestamp))
                }
                None => debug!(resource = %self.resource, metric = %metric, "Ignoring undescribed metric"),
            }
        }
        let missing = self
            .descriptors
            .iter()
            .filter(|d| !readings.iter().any(|r| r.metric == d.id))
            .map(|d| d.id.clone())
            .collect();

        let switch = {
            let mut state = self.state.lock();
            let previous = state.active.replace(index);
            let first_on_primary = !state.started && index == 0;
            state.started = true;
            state.unavailable_logged = false;
            (previous != Some(index) && !first_on_primary).then(|| BackendSwitch {
                from: previous.and_then(|i| self.backends.get(i)).map(|slot| slot.backend.name().to_string()),
                to: backend.clone(),
                degraded: index > 0,
            })
        };
        if let Some(switch) = &switch {
            if switch.degraded {
                warn!(resource = %self.resource, backend = %switch.to, from = ?switch.from, "Running on fallback backend");
            } else {
                info!(resource = %self.resource, backend = %switch.to, "Primary backend restored");
            }
        }

        Sample {
            readings,
            processes: raw.processes.map(Arc::from),
            backend,
            degraded: index > 0,
            switch,
            missing,
            timestamp,
        }
    }
}

#[async_trait]
impl MetricSource for FallbackSource {
    fn resource(&self) -> Resource {
        self.resource
    }

    fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    async fn sample(&self) -> Result<Sample> {
        let mut failures = Vec::with_capacity(self.backends.len());
        for (index, slot) in self.backends.iter().enumerate() {
            match self.try_backend(slot).await {
                Ok(raw) => return Ok(self.finish(index, raw)),
                Err(reason) => {
                    debug!(resource = %self.resource, backend = slot.backend.name(), reason = %reason, "Backend failed");
                    failures.push(format!("{}: {}", slot.backend.name(), reason));
                }
            }
        }

        let reason = if failures.is_empty() { "no backends configured".to_string() } else { failures.join("; ") };
        {
            let mut state = self.state.lock();
            state.active = None;
            state.started = true;
            if !state.unavailable_logged {
                warn!(resource = %self.resource, reason = %reason, "All backends unavailable");
                state.unavailable_logged = true;
            }
        }
        Err(Error::metric_unavailable(self.resource.as_str(), reason))
    }

    fn is_degraded(&self) -> bool {
        self.state.lock().active.is_some_and(|index| index > 0)
    }

    fn max_duration(&self) -> Option<Duration> {
        // a probe and a sample per backend
        Some(self.timeout * (2 * self.backends.len().max(1) as u32))
    }
}
