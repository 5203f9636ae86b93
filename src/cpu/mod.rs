//! # CPU Module
//!
//! Samples overall CPU utilization, the mean core clock and the package
//! temperature. The primary backend computes usage from the delta of two
//! `/proc/stat` counter snapshots and reads the clock and temperature from
//! `/proc/cpuinfo`, cpufreq, hwmon or thermal zones; the fallback asks
//! `sysinfo`. Both need a previous snapshot, so the first sample of each
//! backend takes two reads a short delay apart.
//!
//! Clock and temperature are optional: hosts without the sensors report
//! them as missing while usage keeps flowing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use host_sentinel::config::MonitorConfig;
//! use host_sentinel::traits::MetricSource;
//!
//! # async fn run() -> host_sentinel::error::Result<()> {
//! let source = host_sentinel::cpu::default_source(&MonitorConfig::default());
//! let sample = source.sample().await?;
//! println!("cpu {:.1}% via {}", sample.readings[0].value, sample.backend);
//! # Ok(())
//! # }
//! ```

mod backends;
mod constants;
mod sensors;


pub use backends::{ProcStatBackend, SysinfoCpuBackend};
pub use constants::*;
pub use sensors::CpuSensorPaths;

use crate::config::MonitorConfig;
use crate::core::types::{Resource, Unit};
use crate::source::{FallbackSource, MetricDescriptor};

/// Metrics reported by the CPU source
pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::new(CPU_USAGE, Unit::Percent),
        MetricDescriptor::new(CPU_FREQUENCY_MHZ, Unit::Megahertz),
        MetricDescriptor::new(CPU_TEMPERATURE, Unit::Celsius),
    ]
}

/// `/proc/stat`, then `sysinfo`
pub fn default_source(config: &MonitorConfig) -> FallbackSource {
    FallbackSource::new(Resource::Cpu, descriptors())
        .with_timeout(config.backend_timeout())
        .with_backend(ProcStatBackend::new())
        .with_backend(SysinfoCpuBackend::new())
}
