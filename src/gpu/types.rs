use super::constants::*;
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;

/// Values one GPU backend pass produced. Backends fill what they can.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuStats {
    pub utilization: Option<f64>,
    pub temperature: Option<f64>,
    pub vram_used_mb: Option<f64>,
    pub vram_total_mb: Option<f64>,
    pub power_watts: Option<f64>,
    pub clock_mhz: Option<f64>,
}

impl GpuStats {
    /// VRAM usage as a percentage (0-100)
    pub fn vram_usage(&self) -> Option<f64> {
        match (self.vram_used_mb, self.vram_total_mb) {
            (Some(used), Some(total)) if total > 0.0 => Some(used / total * 100.0),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Converts to a raw sample; a pass that produced nothing is a failure
    pub fn into_sample(self) -> BackendResult<RawSample> {
        if self.is_empty() {
            return Err(BackendError::parse("no GPU values reported"));
        }
        let mut sample = RawSample::new();
        sample.push_opt(GPU_UTILIZATION, self.utilization);
        sample.push_opt(GPU_TEMPERATURE, self.temperature);
        sample.push_opt(GPU_VRAM_USED_MB, self.vram_used_mb);
        sample.push_opt(GPU_VRAM_TOTAL_MB, self.vram_total_mb);
        sample.push_opt(GPU_VRAM_USAGE, self.vram_usage());
        sample.push_opt(GPU_POWER_WATTS, self.power_watts);
        sample.push_opt(GPU_CLOCK_MHZ, self.clock_mhz);
        Ok(sample)
    }
}
