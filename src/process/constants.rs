/// CPU usage of the busiest process, where 100 is one full core
pub const PROCESS_TOP_CPU: &str = "process.top_cpu";
/// Resident memory of the largest process in megabytes
pub const PROCESS_TOP_MEMORY_MB: &str = "process.top_memory_mb";
/// Number of processes in the table
pub const PROCESS_COUNT: &str = "process.count";

pub(crate) const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
