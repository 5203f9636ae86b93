//! # Disk Module
//!
//! Filesystem usage of the configured path plus aggregate disk throughput.
//! The primary backend combines `statvfs(3)` with `/proc/diskstats` counter
//! deltas; throughput needs two snapshots and is therefore missing on the
//! first sample. Only the whole disks `/sys/block` lists are counted. The `sysinfo` fallback only reports usage.

mod backends;
mod constants;

#[cfg(test)]
mod tests;

pub use backends::{StatvfsDiskBackend, SysinfoDiskBackend};
pub use constants::*;

use crate::config::MonitorConfig;
use crate::core::types::{Resource, Unit};
use crate::source::{FallbackSource, MetricDescriptor};

pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![MetricDescriptor::new(DISK_USAGE, Unit::Percent), MetricDescriptor::new(DISK_IO_MB_S, Unit::MegabytesPerSecond)]
}

/// `statvfs` + `/proc/diskstats`, then `sysinfo`
pub fn default_source(config: &MonitorConfig) -> FallbackSource {
    FallbackSource::new(Resource::Disk, descriptors())
        .with_timeout(config.backend_timeout())
        .with_backend(StatvfsDiskBackend::new(&config.disk_path))
        .with_backend(SysinfoDiskBackend::new(&config.disk_path))
}
