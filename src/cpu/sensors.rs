use std::fs;
use std::path::{Path, PathBuf};

use super::constants::*;

/// Where the kernel exposes CPU clock and temperature readings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSensorPaths {
    pub cpuinfo: PathBuf,
    pub cpu_root: PathBuf,
    pub hwmon_root: PathBuf,
    pub thermal_root: PathBuf,
}

impl Default for CpuSensorPaths {
    fn default() -> Self {
        Self::under("/")
    }
}

impl CpuSensorPaths {
    /// The standard layout below `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            cpuinfo: root.join(CPUINFO_PATH),
            cpu_root: root.join(CPU_SYSFS_ROOT),
            hwmon_root: root.join(HWMON_ROOT),
            thermal_root: root.join(THERMAL_ROOT),
        }
    }

    /// Mean clock over all cores in MHz
    pub(crate) fn frequency_mhz(&self) -> Option<f64> {
        fs::read_to_string(&self.cpuinfo)
            .ok()
            .and_then(|content| parse_cpuinfo_mhz(&content))
            .or_else(|| scaling_frequency_mhz(&self.cpu_root))
    }

    /// Package temperature in °C
    pub(crate) fn temperature(&self) -> Option<f64> {
        hwmon_temperature(&self.hwmon_root).or_else(|| thermal_zone_temperature(&self.thermal_root))
    }
}

fn read_number(path: &Path) -> Option<f64> {
    fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok()).filter(|v: &f64| v.is_finite())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Mean of the `cpu MHz` lines of `/proc/cpuinfo`
pub(crate) fn parse_cpuinfo_mhz(content: &str) -> Option<f64> {
    mean(content.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "cpu MHz").then(|| value.trim().parse::<f64>().ok()).flatten()
    }))
    .filter(|mhz| *mhz > 0.0)
}

fn sorted_entries(root: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(root)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
                .map(|entry| entry.path())
                .collect()
        })
        .unwrap_or_default();
    entries.sort();
    entries
}

/// Mean of `cpuN/cpufreq/scaling_cur_freq`, which is in kHz
pub(crate) fn scaling_frequency_mhz(cpu_root: &Path) -> Option<f64> {
    let cores = sorted_entries(cpu_root, "cpu")
        .into_iter()
        .filter(|dir| {
            dir.file_name().is_some_and(|name| {
                let name = name.to_string_lossy();
                name.strip_prefix("cpu").is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            })
        });
    mean(cores.filter_map(|dir| read_number(&dir.join("cpufreq/scaling_cur_freq")))).map(|khz| khz / 1000.0)
}

/// Whether a sensor or zone name belongs to the CPU package
pub(crate) fn is_cpu_sensor(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    CPU_SENSOR_NAMES.iter().any(|known| name.contains(known))
}

/// First CPU hwmon chip's `temp1_input`, in millidegrees
pub(crate) fn hwmon_temperature(hwmon_root: &Path) -> Option<f64> {
    sorted_entries(hwmon_root, "hwmon")
        .into_iter()
        .filter(|chip| fs::read_to_string(chip.join("name")).is_ok_and(|name| is_cpu_sensor(&name)))
        .find_map(|chip| read_number(&chip.join("temp1_input")))
        .map(|milli| milli / 1000.0)
}

/// First CPU thermal zone's `temp`, in millidegrees
pub(crate) fn thermal_zone_temperature(thermal_root: &Path) -> Option<f64> {
    sorted_entries(thermal_root, "thermal_zone")
        .into_iter()
        .filter(|zone| fs::read_to_string(zone.join("type")).is_ok_and(|kind| is_cpu_sensor(&kind)))
        .find_map(|zone| read_number(&zone.join("temp")))
        .map(|milli| milli / 1000.0)
}
