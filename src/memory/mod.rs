//! Memory usage module
//!
//! Reports physical memory and swap usage. "Used" means total minus
//! available, so reclaimable page cache does not count as pressure. The
//! primary backend parses `/proc/meminfo`; `sysinfo` is the fallback.

mod backends;
mod constants;

#[cfg(test)]
mod tests;

pub use backends::{ProcMeminfoBackend, SysinfoMemoryBackend};
pub use constants::*;

use crate::config::MonitorConfig;
use crate::core::types::{Resource, Unit};
use crate::source::{FallbackSource, MetricDescriptor};

pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::new(MEMORY_USAGE, Unit::Percent),
        MetricDescriptor::new(MEMORY_USED_MB, Unit::Megabytes),
        MetricDescriptor::new(MEMORY_SWAP_USAGE, Unit::Percent),
    ]
}

/// `/proc/meminfo`, then `sysinfo`
pub fn default_source(config: &MonitorConfig) -> FallbackSource {
    FallbackSource::new(Resource::Memory, descriptors())
        .with_timeout(config.backend_timeout())
        .with_backend(ProcMeminfoBackend::new())
        .with_backend(SysinfoMemoryBackend::new())
}
