use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use nvml_wrapper::enum_wrappers::device::{Clock, TemperatureSensor};
use nvml_wrapper::Nvml;
use parking_lot::Mutex;
use serde_json::Value;

use super::constants::*;
use super::types::GpuStats;
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;
use crate::traits::MetricBackend;
use crate::utils::{command_output, find_executable, parse_f64, run_blocking};

//=============================================================================
// Vendor command line tools
//=============================================================================

/// First number inside text such as `(1000Mhz)` or `45.0`
pub(crate) fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn number_in(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

/// Parses `rocm-smi --json` output for the first card
pub(crate) fn parse_rocm_json(output: &str) -> BackendResult<GpuStats> {
    let root: Value = serde_json::from_str(output).map_err(|e| BackendError::parse(format!("rocm-smi json: {e}")))?;
    let card = root
        .as_object()
        .and_then(|cards| cards.iter().find(|(name, _)| name.starts_with("card")))
        .and_then(|(_, card)| card.as_object())
        .ok_or_else(|| BackendError::parse("rocm-smi reported no cards"))?;

    let find = |matches: &dyn Fn(&str) -> bool| -> Option<f64> {
        card.iter().find(|(key, _)| matches(&key.to_lowercase())).and_then(|(_, value)| number_in(value))
    };

    Ok(GpuStats {
        utilization: find(&|k: &str| k.starts_with("gpu use")),
        temperature: find(&|k: &str| k.contains("temperature") && k.contains("edge"))
            .or_else(|| find(&|k: &str| k.contains("temperature"))),
        vram_used_mb: find(&|k: &str| k.contains("vram total used memory")).map(|b| b / BYTES_PER_MB),
        vram_total_mb: find(&|k: &str| k.starts_with("vram total memory")).map(|b| b / BYTES_PER_MB),
        power_watts: find(&|k: &str| k.contains("power") && k.ends_with("(w)")),
        clock_mhz: find(&|k: &str| k.starts_with("sclk")),
    })
}

/// Parses one line of `nvidia-smi --format=csv,noheader,nounits`
pub(crate) fn parse_nvidia_csv(output: &str) -> BackendResult<GpuStats> {
    let line = output.lines().find(|l| !l.trim().is_empty()).ok_or_else(|| BackendError::parse("nvidia-smi printed nothing"))?;
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 6 {
        return Err(BackendError::parse(format!("expected 6 nvidia-smi columns, got {}", fields.len())));
    }
    let column = |index: usize, name: &str| -> BackendResult<Option<f64>> {
        match fields[index] {
            "[N/A]" | "N/A" | "[Not Supported]" => Ok(None),
            raw => parse_f64(name, raw).map(Some),
        }
    };

    Ok(GpuStats {
        utilization: column(0, "utilization.gpu")?,
        temperature: column(1, "temperature.gpu")?,
        vram_used_mb: column(2, "memory.used")?,
        vram_total_mb: column(3, "memory.total")?,
        power_watts: column(4, "power.draw")?,
        clock_mhz: column(5, "clocks.gr")?,
    })
}

/// AMD GPUs through `rocm-smi`
#[derive(Debug, Clone)]
pub struct RocmSmiBackend {
    program: String,
}

impl Default for RocmSmiBackend {
    fn default() -> Self {
        Self { program: ROCM_SMI.to_string() }
    }
}

impl RocmSmiBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricBackend for RocmSmiBackend {
    fn name(&self) -> &str {
        ROCM_SMI
    }

    async fn probe(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let output = command_output(&self.program, ROCM_SMI_ARGS).await?;
        parse_rocm_json(&output)?.into_sample()
    }
}

/// NVIDIA GPUs through `nvidia-smi`
#[derive(Debug, Clone)]
pub struct NvidiaSmiBackend {
    program: String,
}

impl Default for NvidiaSmiBackend {
    fn default() -> Self {
        Self { program: NVIDIA_SMI.to_string() }
    }
}

impl NvidiaSmiBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricBackend for NvidiaSmiBackend {
    fn name(&self) -> &str {
        NVIDIA_SMI
    }

    async fn probe(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let output = command_output(&self.program, NVIDIA_SMI_ARGS).await?;
        parse_nvidia_csv(&output)?.into_sample()
    }
}

//=============================================================================
// amdgpu sysfs
//=============================================================================

fn read_number(path: &Path) -> Option<f64> {
    fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok())
}

/// First `cardN/device` directory driven by amdgpu
pub(crate) fn find_amdgpu_device(root: &Path) -> BackendResult<PathBuf> {
    let entries = fs::read_dir(root).map_err(|e| BackendError::from_io(&root.display().to_string(), e))?;
    let mut cards: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.strip_prefix("card").is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|entry| entry.path().join("device"))
        .filter(|device| device.join("gpu_busy_percent").is_file())
        .collect();
    cards.sort();
    cards.into_iter().next().ok_or_else(|| BackendError::unsupported("no amdgpu device in sysfs"))
}

/// Reads the amdgpu attributes of one device directory
pub(crate) fn read_amdgpu(device: &Path) -> GpuStats {
    let hwmon = fs::read_dir(device.join("hwmon"))
        .ok()
        .and_then(|mut entries| entries.find_map(|entry| entry.ok()))
        .map(|entry| entry.path());
    let in_hwmon = |file: &str| hwmon.as_ref().and_then(|dir| read_number(&dir.join(file)));

    let clock_mhz = fs::read_to_string(device.join("pp_dpm_sclk")).ok().and_then(|levels| {
        levels
            .lines()
            .find(|line| line.trim_end().ends_with('*'))
            .and_then(|line| leading_number(line.split(':').nth(1)?))
    });

    GpuStats {
        utilization: read_number(&device.join("gpu_busy_percent")),
        temperature: in_hwmon("temp1_input").map(|milli| milli / 1000.0),
        vram_used_mb: read_number(&device.join("mem_info_vram_used")).map(|b| b / BYTES_PER_MB),
        vram_total_mb: read_number(&device.join("mem_info_vram_total")).map(|b| b / BYTES_PER_MB),
        power_watts: in_hwmon("power1_average").or_else(|| in_hwmon("power1_input")).map(|micro| micro / 1_000_000.0),
        clock_mhz,
    }
}

/// AMD GPUs through the kernel's amdgpu sysfs attributes
#[derive(Debug, Clone)]
pub struct AmdSysfsBackend {
    root: PathBuf,
}

impl Default for AmdSysfsBackend {
    fn default() -> Self {
        Self::with_root(DRM_CLASS_PATH)
    }
}

impl AmdSysfsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MetricBackend for AmdSysfsBackend {
    fn name(&self) -> &str {
        "amdgpu-sysfs"
    }

    async fn probe(&self) -> bool {
        let root = self.root.clone();
        run_blocking("amdgpu probe", move || find_amdgpu_device(&root)).await.is_ok()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let root = self.root.clone();
        run_blocking("amdgpu sysfs", move || read_amdgpu(&find_amdgpu_device(&root)?).into_sample()).await
    }
}

//=============================================================================
// NVML
//=============================================================================

/// NVIDIA GPUs through the NVML library, loaded on first probe
#[derive(Default)]
pub struct NvmlBackend {
    nvml: Mutex<Option<Arc<Nvml>>>,
}

impl std::fmt::Debug for NvmlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvmlBackend").field("loaded", &self.nvml.lock().is_some()).finish()
    }
}

impl NvmlBackend {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handle(&self) -> BackendResult<Arc<Nvml>> {
        if let Some(nvml) = self.nvml.lock().clone() {
            return Ok(nvml);
        }
        let nvml = run_blocking("nvml init", || {
            Nvml::init().map(Arc::new).map_err(|e| BackendError::library(format!("nvml init: {e}")))
        })
        .await?;
        *self.nvml.lock() = Some(Arc::clone(&nvml));
        Ok(nvml)
    }
}

#[async_trait]
impl MetricBackend for NvmlBackend {
    fn name(&self) -> &str {
        "nvml"
    }

    async fn probe(&self) -> bool {
        self.handle().await.is_ok()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let nvml = self.handle().await?;
        let stats = run_blocking("nvml sample", move || {
            let device = nvml.device_by_index(0).map_err(|e| BackendError::library(format!("nvml device 0: {e}")))?;
            let memory = device.memory_info().ok();
            Ok(GpuStats {
                utilization: device.utilization_rates().ok().map(|u| f64::from(u.gpu)),
                temperature: device.temperature(TemperatureSensor::Gpu).ok().map(f64::from),
                vram_used_mb: memory.as_ref().map(|m| m.used as f64 / BYTES_PER_MB),
                vram_total_mb: memory.as_ref().map(|m| m.total as f64 / BYTES_PER_MB),
                power_watts: device.power_usage().ok().map(|milliwatts| f64::from(milliwatts) / 1000.0),
                clock_mhz: device.clock_info(Clock::Graphics).ok().map(f64::from),
            })
        })
        .await?;
        stats.into_sample()
    }
}
