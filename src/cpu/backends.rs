use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::{Components, System};

use super::constants::*;
use super::sensors::{is_cpu_sensor, CpuSensorPaths};
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;
use crate::traits::MetricBackend;
use crate::utils::{read_file, run_blocking};

/// Aggregate CPU time counters from the `cpu` line of `/proc/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Parses the aggregate `cpu` line.
///
/// Guest time is already included in user and nice time, so only the first
/// eight columns count towards the total.
pub(crate) fn parse_proc_stat(content: &str) -> BackendResult<CpuTimes> {
    let line = content
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| BackendError::parse("no aggregate cpu line in /proc/stat"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>().map_err(|_| BackendError::parse(format!("bad cpu counter {f:?}"))))
        .collect::<BackendResult<Vec<u64>>>()?;
    if fields.len() < 4 {
        return Err(BackendError::parse("too few cpu counters"));
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes { busy: total.saturating_sub(idle), total })
}

/// Busy share between two snapshots, `None` if the counters did not advance
pub(crate) fn usage_between(previous: &CpuTimes, current: &CpuTimes) -> Option<f64> {
    let elapsed = current.total.checked_sub(previous.total).filter(|&d| d > 0)?;
    let busy = current.busy.saturating_sub(previous.busy);
    Some((busy as f64 / elapsed as f64 * 100.0).clamp(0.0, 100.0))
}

/// CPU usage from `/proc/stat` counter deltas, clock and temperature from
/// procfs and sysfs
#[derive(Debug)]
pub struct ProcStatBackend {
    path: PathBuf,
    sensors: CpuSensorPaths,
    previous: Mutex<Option<CpuTimes>>,
}

impl Default for ProcStatBackend {
    fn default() -> Self {
        Self::with_path(PROC_STAT_PATH)
    }
}

impl ProcStatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), sensors: CpuSensorPaths::default(), previous: Mutex::new(None) }
    }

    pub fn with_sensors(mut self, sensors: CpuSensorPaths) -> Self {
        self.sensors = sensors;
        self
    }

    #[cfg(test)]
    pub(crate) fn previous_for_test(&self) -> parking_lot::MutexGuard<'_, Option<CpuTimes>> {
        self.previous.lock()
    }

    async fn read_times(&self) -> BackendResult<CpuTimes> {
        parse_proc_stat(&read_file(&self.path).await?)
    }
}

#[async_trait]
impl MetricBackend for ProcStatBackend {
    fn name(&self) -> &str {
        "proc-stat"
    }

    async fn probe(&self) -> bool {
        self.read_times().await.is_ok()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let current = self.read_times().await?;
        let previous = self.previous.lock().replace(current);

        let usage = match previous.and_then(|p| usage_between(&p, &current)) {
            Some(usage) => usage,
            None => {
                tokio::time::sleep(PRIME_DELAY).await;
                let next = self.read_times().await?;
                *self.previous.lock() = Some(next);
                usage_between(&current, &next).ok_or_else(|| BackendError::parse("cpu counters did not advance"))?
            }
        };

        let sensors = self.sensors.clone();
        let (frequency, temperature) =
            run_blocking("cpu sensors", move || Ok((sensors.frequency_mhz(), sensors.temperature()))).await?;

        let mut sample = RawSample::new().with_value(CPU_USAGE, usage);
        sample.push_opt(CPU_FREQUENCY_MHZ, frequency);
        sample.push_opt(CPU_TEMPERATURE, temperature);
        Ok(sample)
    }
}

/// Mean of the per-core clocks `sysinfo` reports, ignoring cores that read 0
pub(crate) fn mean_frequency(frequencies: impl IntoIterator<Item = u64>) -> Option<f64> {
    let (sum, count) = frequencies.into_iter().filter(|&mhz| mhz > 0).fold((0u64, 0u64), |(s, c), mhz| (s + mhz, c + 1));
    (count > 0).then(|| sum as f64 / count as f64)
}

/// Hottest CPU sensor among `(label, °C)` pairs
pub(crate) fn cpu_temperature<'a>(sensors: impl IntoIterator<Item = (&'a str, f32)>) -> Option<f64> {
    sensors
        .into_iter()
        .filter(|(label, celsius)| is_cpu_sensor(label) && celsius.is_finite() && *celsius > 0.0)
        .map(|(_, celsius)| f64::from(celsius))
        .reduce(f64::max)
}

/// CPU usage, clock and temperature as reported by `sysinfo`
#[derive(Debug, Clone)]
pub struct SysinfoCpuBackend {
    system: Arc<Mutex<System>>,
    components: Arc<Mutex<Option<Components>>>,
    primed: Arc<AtomicBool>,
}

impl Default for SysinfoCpuBackend {
    fn default() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            components: Arc::new(Mutex::new(None)),
            primed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SysinfoCpuBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricBackend for SysinfoCpuBackend {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn probe(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let system = Arc::clone(&self.system);
        let components = Arc::clone(&self.components);
        let primed = Arc::clone(&self.primed);
        run_blocking("sysinfo cpu", move || {
            let mut system = system.lock();
            system.refresh_cpu();
            if !primed.swap(true, Ordering::AcqRel) {
                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                system.refresh_cpu();
            }

            let mut guard = components.lock();
            let components = guard.get_or_insert_with(Components::new_with_refreshed_list);
            components.refresh();

            let mut sample = RawSample::new().with_value(CPU_USAGE, f64::from(system.global_cpu_info().cpu_usage()));
            sample.push_opt(CPU_FREQUENCY_MHZ, mean_frequency(system.cpus().iter().map(|cpu| cpu.frequency())));
            sample.push_opt(
                CPU_TEMPERATURE,
                cpu_temperature(components.list().iter().map(|c| (c.label(), c.temperature()))),
            );
            Ok(sample)
        })
        .await
    }
}
