pub const GPU_UTILIZATION: &str = "gpu.utilization";
pub const GPU_TEMPERATURE: &str = "gpu.temperature";
pub const GPU_VRAM_USED_MB: &str = "gpu.vram_used_mb";
pub const GPU_VRAM_TOTAL_MB: &str = "gpu.vram_total_mb";
pub const GPU_VRAM_USAGE: &str = "gpu.vram_usage";
pub const GPU_POWER_WATTS: &str = "gpu.power_watts";
pub const GPU_CLOCK_MHZ: &str = "gpu.clock_mhz";

pub const ROCM_SMI: &str = "rocm-smi";
pub const ROCM_SMI_ARGS: &[&str] =
    &["--showuse", "--showtemp", "--showmeminfo", "vram", "--showpower", "--showclocks", "--json"];

pub const NVIDIA_SMI: &str = "nvidia-smi";
pub const NVIDIA_SMI_ARGS: &[&str] = &[
    "--query-gpu=utilization.gpu,temperature.gpu,memory.used,memory.total,power.draw,clocks.gr",
    "--format=csv,noheader,nounits",
];

/// Root of the DRM class directory holding amdgpu sysfs attributes
pub const DRM_CLASS_PATH: &str = "/sys/class/drm";

pub(crate) const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
