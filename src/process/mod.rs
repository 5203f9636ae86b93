//! Process table module
//!
//! Summarizes the host's process table into three metrics and carries the
//! full [`ProcessInfo`](crate::core::metrics::ProcessInfo) list along with
//! the sample, where the action policy picks corrective-action targets from
//! it for the same tick.

mod backends;
mod constants;


pub use backends::{summarize, SysinfoProcessBackend};
pub use constants::*;

use crate::config::MonitorConfig;
use crate::core::types::{Resource, Unit};
use crate::source::{FallbackSource, MetricDescriptor};

pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::new(PROCESS_TOP_CPU, Unit::Percent),
        MetricDescriptor::new(PROCESS_TOP_MEMORY_MB, Unit::Megabytes),
        MetricDescriptor::new(PROCESS_COUNT, Unit::Count),
    ]
}

pub fn default_source(config: &MonitorConfig) -> FallbackSource {
    FallbackSource::new(Resource::Process, descriptors())
        .with_timeout(config.backend_timeout())
        .with_backend(SysinfoProcessBackend::new())
}
