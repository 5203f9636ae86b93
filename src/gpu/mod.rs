//! # GPU Module
//!
//! GPU utilization, temperature, VRAM, power and clock. One backend pass
//! produces every sub-metric, so all GPU readings of a tick share the same
//! backend outcome. The chain tries the vendor command line tools first
//! (`rocm-smi`, then `nvidia-smi`), then the amdgpu sysfs interface, and
//! finally NVML through `nvml-wrapper`. Sub-metrics the serving backend
//! cannot supply are reported missing for that tick.
//!
//! Only the first GPU is sampled.

mod backends;
mod constants;
mod types;


pub use backends::{AmdSysfsBackend, NvidiaSmiBackend, NvmlBackend, RocmSmiBackend};
pub use constants::*;
pub use types::GpuStats;

use crate::config::MonitorConfig;
use crate::core::types::{Resource, Unit};
use crate::source::{FallbackSource, MetricDescriptor};

pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::new(GPU_UTILIZATION, Unit::Percent),
        MetricDescriptor::new(GPU_TEMPERATURE, Unit::Celsius),
        MetricDescriptor::new(GPU_VRAM_USED_MB, Unit::Megabytes),
        MetricDescriptor::new(GPU_VRAM_TOTAL_MB, Unit::Megabytes),
        MetricDescriptor::new(GPU_VRAM_USAGE, Unit::Percent),
        MetricDescriptor::new(GPU_POWER_WATTS, Unit::Watts),
        MetricDescriptor::new(GPU_CLOCK_MHZ, Unit::Megahertz),
    ]
}

/// `rocm-smi`, `nvidia-smi`, amdgpu sysfs, then NVML
pub fn default_source(config: &MonitorConfig) -> FallbackSource {
    FallbackSource::new(Resource::Gpu, descriptors())
        .with_timeout(config.backend_timeout())
        .with_backend(RocmSmiBackend::new())
        .with_backend(NvidiaSmiBackend::new())
        .with_backend(AmdSysfsBackend::new())
        .with_backend(NvmlBackend::new())
}
