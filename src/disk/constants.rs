/// Used share of the monitored filesystem in percent
pub const DISK_USAGE: &str = "disk.usage";
/// Combined read and write throughput of all physical disks
pub const DISK_IO_MB_S: &str = "disk.io_mb_s";

pub const PROC_DISKSTATS_PATH: &str = "/proc/diskstats";
/// One entry per whole disk, partitions live below their disk
pub const SYS_BLOCK_PATH: &str = "/sys/block";

/// `/proc/diskstats` always counts 512-byte sectors
pub(crate) const SECTOR_BYTES: f64 = 512.0;
pub(crate) const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Virtual and stacked devices whose traffic is already counted elsewhere
pub(crate) const IGNORED_DEVICE_PREFIXES: &[&str] = &["loop", "ram", "zram", "fd", "sr", "dm-", "md"];
