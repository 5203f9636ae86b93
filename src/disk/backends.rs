use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::Disks;

use super::constants::*;
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;
use crate::traits::MetricBackend;
use crate::utils::{read_file, run_blocking};

/// Used share of a filesystem, computed the way `df` does
#[cfg(unix)]
pub(crate) fn statvfs_usage(path: &Path) -> BackendResult<f64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| BackendError::parse("path contains NUL"))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(BackendError::from_io(&path.display().to_string(), std::io::Error::last_os_error()));
    }

    let used = stat.f_blocks.saturating_sub(stat.f_bfree) as f64;
    let capacity = used + stat.f_bavail as f64;
    if capacity <= 0.0 {
        return Err(BackendError::parse(format!("{} reports no blocks", path.display())));
    }
    Ok(used / capacity * 100.0)
}

#[cfg(not(unix))]
pub(crate) fn statvfs_usage(path: &Path) -> BackendResult<f64> {
    Err(BackendError::unsupported(format!("statvfs on {}", path.display())))
}

/// Whether `name` is a partition of `parent`: `sda1` of `sda`, `nvme0n1p2`
/// of `nvme0n1`. A parent ending in a digit separates partitions with `p`.
pub(crate) fn is_partition_of(name: &str, parent: &str) -> bool {
    let Some(suffix) = name.strip_prefix(parent) else {
        return false;
    };
    let number = if parent.ends_with(|c: char| c.is_ascii_digit()) { suffix.strip_prefix('p').unwrap_or("") } else { suffix };
    !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
}

/// Total sectors read and written by physical disks.
///
/// With the `/sys/block` listing only its devices count. Without it, rows
/// that are a partition of another listed row are skipped so traffic is not
/// counted twice.
pub(crate) fn parse_diskstats(content: &str, whole_disks: Option<&HashSet<String>>) -> BackendResult<u64> {
    let rows: Vec<(&str, u64)> = content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = *fields.get(2)?;
            let read: u64 = fields.get(5)?.parse().ok()?;
            let written: u64 = fields.get(9)?.parse().ok()?;
            Some((name, read + written))
        })
        .filter(|(name, _)| !IGNORED_DEVICE_PREFIXES.iter().any(|p| name.starts_with(p)))
        .collect();

    let is_disk = |name: &str| match whole_disks {
        Some(disks) => disks.contains(name),
        None => !rows.iter().any(|(parent, _)| is_partition_of(name, parent)),
    };
    let disks: Vec<u64> = rows.iter().filter(|&&(name, _)| is_disk(name)).map(|&(_, sectors)| sectors).collect();
    if disks.is_empty() {
        return Err(BackendError::parse("no disks in /proc/diskstats"));
    }
    Ok(disks.iter().sum())
}

/// Device names under `/sys/block`, `None` when the listing is unavailable
pub(crate) async fn read_whole_disks(dir: &Path) -> Option<HashSet<String>> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut names = HashSet::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    (!names.is_empty()).then_some(names)
}

/// Usage via `statvfs` and throughput via `/proc/diskstats`
#[derive(Debug)]
pub struct StatvfsDiskBackend {
    path: PathBuf,
    diskstats: PathBuf,
    sys_block: PathBuf,
    previous: Mutex<Option<(Instant, u64)>>,
}

impl StatvfsDiskBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_diskstats(path, PROC_DISKSTATS_PATH)
    }

    pub fn with_diskstats(path: impl Into<PathBuf>, diskstats: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            diskstats: diskstats.into(),
            sys_block: PathBuf::from(SYS_BLOCK_PATH),
            previous: Mutex::new(None),
        }
    }

    /// Directory listing the whole disks, `/sys/block` by default
    pub fn with_sys_block(mut self, sys_block: impl Into<PathBuf>) -> Self {
        self.sys_block = sys_block.into();
        self
    }

    /// Throughput since the previous call, `None` on the first one
    async fn throughput(&self) -> Option<f64> {
        let whole_disks = read_whole_disks(&self.sys_block).await;
        let sectors = match read_file(&self.diskstats).await.and_then(|c| parse_diskstats(&c, whole_disks.as_ref())) {
            Ok(sectors) => sectors,
            Err(e) => {
                tracing::debug!(error = %e, "Disk throughput unavailable");
                return None;
            }
        };
        let now = Instant::now();
        let (then, before) = self.previous.lock().replace((now, sectors))?;
        let elapsed = now.duration_since(then).as_secs_f64();
        (elapsed > 0.0).then(|| sectors.saturating_sub(before) as f64 * SECTOR_BYTES / BYTES_PER_MB / elapsed)
    }
}

#[async_trait]
impl MetricBackend for StatvfsDiskBackend {
    fn name(&self) -> &str {
        "statvfs"
    }

    async fn probe(&self) -> bool {
        cfg!(unix) && self.path.exists()
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let path = self.path.clone();
        let usage = run_blocking("statvfs", move || statvfs_usage(&path)).await?;
        let mut sample = RawSample::new().with_value(DISK_USAGE, usage);
        sample.push_opt(DISK_IO_MB_S, self.throughput().await);
        Ok(sample)
    }
}

/// Usage of the filesystem mounted closest to the path, through `sysinfo`
#[derive(Debug, Clone)]
pub struct SysinfoDiskBackend {
    path: PathBuf,
    disks: Arc<Mutex<Option<Disks>>>,
}

impl SysinfoDiskBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), disks: Arc::new(Mutex::new(None)) }
    }
}

#[async_trait]
impl MetricBackend for SysinfoDiskBackend {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn probe(&self) -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let path = self.path.clone();
        let disks = Arc::clone(&self.disks);
        let usage = run_blocking("sysinfo disks", move || {
            let mut guard = disks.lock();
            let disks = guard.get_or_insert_with(Disks::new_with_refreshed_list);
            disks.refresh();

            let disk = disks
                .list()
                .iter()
                .filter(|d| path.starts_with(d.mount_point()))
                .max_by_key(|d| d.mount_point().as_os_str().len())
                .ok_or_else(|| BackendError::unsupported(format!("no filesystem mounted at {}", path.display())))?;
            let total = disk.total_space();
            if total == 0 {
                return Err(BackendError::parse(format!("{} reports zero size", disk.mount_point().display())));
            }
            let used = total.saturating_sub(disk.available_space());
            Ok(used as f64 / total as f64 * 100.0)
        })
        .await?;
        Ok(RawSample::new().with_value(DISK_USAGE, usage))
    }
}
