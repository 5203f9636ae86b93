use std::time::Duration;

/// Overall CPU utilization in percent
pub const CPU_USAGE: &str = "cpu.usage";

/// Kernel CPU time counters
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Gap between the two counter reads of a first sample
pub const PRIME_DELAY: Duration = Duration::from_millis(200);

/// Mean clock of all cores in MHz
pub const CPU_FREQUENCY_MHZ: &str = "cpu.frequency_mhz";

/// Package temperature in °C
pub const CPU_TEMPERATURE: &str = "cpu.temperature";

/// Sensor locations, relative to the filesystem root
pub const CPUINFO_PATH: &str = "proc/cpuinfo";
pub const CPU_SYSFS_ROOT: &str = "sys/devices/system/cpu";
pub const HWMON_ROOT: &str = "sys/class/hwmon";
pub const THERMAL_ROOT: &str = "sys/class/thermal";

/// Lowercase fragments of hwmon chip names, thermal zone types and sensor
/// labels that report the CPU package
pub const CPU_SENSOR_NAMES: &[&str] = &["coretemp", "k10temp", "zenpower", "cpu", "x86_pkg_temp", "package", "tctl"];
