//! Network latency module
//!
//! Latency is measured as the time to complete a TCP handshake with a
//! configured `host:port` target. Each sample makes [`PROBE_ATTEMPTS`]
//! sequential attempts; failed attempts are charged [`FAILED_ATTEMPT_MS`], and
//! a sample where every attempt fails is a backend failure. Each configured
//! target is one backend, so later targets act as fallbacks for earlier ones.

mod backends;
mod constants;

#[cfg(test)]
mod tests;

pub use backends::{latency_stats, TcpConnectBackend};
pub use constants::*;

use crate::config::MonitorConfig;
use crate::core::types::{Resource, Unit};
use crate::source::{FallbackSource, MetricDescriptor};

pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![MetricDescriptor::new(NET_LATENCY_MS, Unit::Milliseconds), MetricDescriptor::new(NET_JITTER_MS, Unit::Milliseconds)]
}

/// One TCP connect backend per configured latency target.
///
/// The source timeout is widened to fit every connect attempt of a backend.
pub fn default_source(config: &MonitorConfig) -> FallbackSource {
    let attempts = ATTEMPT_TIMEOUT * PROBE_ATTEMPTS as u32 + SOURCE_TIMEOUT_MARGIN;
    config.latency_targets.iter().fold(
        FallbackSource::new(Resource::Network, descriptors()).with_timeout(config.backend_timeout().max(attempts)),
        |source, target| source.with_backend(TcpConnectBackend::new(target)),
    )
}
