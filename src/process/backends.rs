use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::System;

use super::constants::*;
use crate::core::metrics::ProcessInfo;
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;
use crate::traits::MetricBackend;
use crate::utils::run_blocking;

/// Builds the summary metrics for a process snapshot and attaches it
pub fn summarize(processes: Vec<ProcessInfo>) -> RawSample {
    let top_cpu = processes.iter().map(|p| p.cpu_percent).reduce(f64::max);
    let top_memory = processes.iter().map(|p| p.memory_mb).reduce(f64::max);

    let mut sample = RawSample::new();
    sample.push_opt(PROCESS_TOP_CPU, top_cpu);
    sample.push_opt(PROCESS_TOP_MEMORY_MB, top_memory);
    sample.push(PROCESS_COUNT, processes.len() as f64);
    sample.with_processes(processes)
}

/// Process table as reported by `sysinfo`
#[derive(Debug, Clone)]
pub struct SysinfoProcessBackend {
    system: Arc<Mutex<System>>,
    primed: Arc<AtomicBool>,
}

impl Default for SysinfoProcessBackend {
    fn default() -> Self {
        Self { system: Arc::new(Mutex::new(System::new())), primed: Arc::new(AtomicBool::new(false)) }
    }
}

impl SysinfoProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricBackend for SysinfoProcessBackend {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn probe(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let system = Arc::clone(&self.system);
        let primed = Arc::clone(&self.primed);
        let processes = run_blocking("sysinfo processes", move || {
            let mut system = system.lock();
            system.refresh_processes();
            // per-process CPU usage needs two refreshes to have a baseline
            if !primed.swap(true, Ordering::AcqRel) {
                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                system.refresh_processes();
            }

            let processes: Vec<ProcessInfo> = system
                .processes()
                .iter()
                .map(|(pid, process)| {
                    ProcessInfo::new(
                        pid.as_u32(),
                        process.name(),
                        f64::from(process.cpu_usage()),
                        process.memory() as f64 / BYTES_PER_MB,
                    )
                })
                .collect();
            if processes.is_empty() {
                return Err(BackendError::unsupported("empty process table"));
            }
            Ok(processes)
        })
        .await?;
        Ok(summarize(processes))
    }
}
