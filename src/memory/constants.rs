/// Used share of physical memory in percent
pub const MEMORY_USAGE: &str = "memory.usage";
/// Used physical memory in megabytes
pub const MEMORY_USED_MB: &str = "memory.used_mb";
/// Used share of swap in percent, absent on hosts without swap
pub const MEMORY_SWAP_USAGE: &str = "memory.swap_usage";

pub const PROC_MEMINFO_PATH: &str = "/proc/meminfo";

pub(crate) const KIB_PER_MB: f64 = 1024.0;
pub(crate) const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
