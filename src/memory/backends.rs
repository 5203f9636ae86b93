use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::System;

use super::constants::*;
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;
use crate::traits::MetricBackend;
use crate::utils::{read_file, run_blocking};

/// Memory figures in kibibytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemInfo {
    pub total_kib: u64,
    pub available_kib: u64,
    pub swap_total_kib: u64,
    pub swap_free_kib: u64,
}

impl MemInfo {
    pub(crate) fn into_sample(self) -> BackendResult<RawSample> {
        if self.total_kib == 0 {
            return Err(BackendError::parse("total memory is zero"));
        }
        let used = self.total_kib.saturating_sub(self.available_kib);
        let mut sample = RawSample::new()
            .with_value(MEMORY_USAGE, used as f64 / self.total_kib as f64 * 100.0)
            .with_value(MEMORY_USED_MB, used as f64 / KIB_PER_MB);
        if self.swap_total_kib > 0 {
            let swap_used = self.swap_total_kib.saturating_sub(self.swap_free_kib);
            sample.push(MEMORY_SWAP_USAGE, swap_used as f64 / self.swap_total_kib as f64 * 100.0);
        }
        Ok(sample)
    }
}

/// Parses `/proc/meminfo`.
///
/// Kernels older than 3.14 have no `MemAvailable`; free plus buffers plus
/// page cache is used instead.
pub(crate) fn parse_meminfo(content: &str) -> BackendResult<MemInfo> {
    let field = |name: &str| -> Option<u64> {
        content
            .lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|value| value.parse().ok())
    };

    let total_kib = field("MemTotal").ok_or_else(|| BackendError::parse("MemTotal missing"))?;
    let available_kib = match field("MemAvailable") {
        Some(available) => available,
        None => {
            let free = field("MemFree").ok_or_else(|| BackendError::parse("MemFree missing"))?;
            free + field("Buffers").unwrap_or(0) + field("Cached").unwrap_or(0)
        }
    };
    Ok(MemInfo {
        total_kib,
        available_kib: available_kib.min(total_kib),
        swap_total_kib: field("SwapTotal").unwrap_or(0),
        swap_free_kib: field("SwapFree").unwrap_or(0),
    })
}

/// Memory usage from `/proc/meminfo`
#[derive(Debug, Clone)]
pub struct ProcMeminfoBackend {
    path: PathBuf,
}

impl Default for ProcMeminfoBackend {
    fn default() -> Self {
        Self::with_path(PROC_MEMINFO_PATH)
    }
}

impl ProcMeminfoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricBackend for ProcMeminfoBackend {
    fn name(&self) -> &str {
        "proc-meminfo"
    }

    async fn probe(&self) -> bool {
        self.path.is_file()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        parse_meminfo(&read_file(&self.path).await?)?.into_sample()
    }
}

/// Memory usage as reported by `sysinfo`
#[derive(Debug, Clone)]
pub struct SysinfoMemoryBackend {
    system: Arc<Mutex<System>>,
}

impl Default for SysinfoMemoryBackend {
    fn default() -> Self {
        Self { system: Arc::new(Mutex::new(System::new())) }
    }
}

impl SysinfoMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricBackend for SysinfoMemoryBackend {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn probe(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let system = Arc::clone(&self.system);
        let info = run_blocking("sysinfo memory", move || {
            let mut system = system.lock();
            system.refresh_memory();
            Ok(MemInfo {
                total_kib: system.total_memory() / 1024,
                available_kib: system.available_memory() / 1024,
                swap_total_kib: system.total_swap() / 1024,
                swap_free_kib: system.free_swap() / 1024,
            })
        })
        .await?;
        info.into_sample()
    }
}
