/// Default time between sampling ticks in seconds
pub const DEFAULT_INTERVAL_SECS: f64 = 5.0;

/// Default number of readings kept per metric (one hour at the default interval)
pub const DEFAULT_HISTORY_CAPACITY: usize = 720;

/// Default timeout applied to every backend probe and sample call
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 1000;

/// Consecutive unavailable ticks after which a metric is reported Unknown
pub const DEFAULT_UNKNOWN_AFTER: u32 = 3;

/// Default number of agreeing samples required before a severity change
pub const DEFAULT_DEBOUNCE_COUNT: u32 = 3;

/// Default minimum time between corrective actions on the same target
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

/// Default number of candidate processes considered for a corrective action
pub const DEFAULT_MAX_TARGETS: usize = 3;

/// Default nice increment applied when lowering a process priority
pub const DEFAULT_NICE_INCREMENT: i32 = 10;

/// Mount point whose usage the disk source reports by default
pub const DEFAULT_DISK_PATH: &str = "/";

/// Hosts probed by the network latency source, in fallback order
pub const DEFAULT_LATENCY_TARGETS: [&str; 2] = ["8.8.8.8:53", "1.1.1.1:53"];

/// Process names never touched by corrective actions unless configured otherwise
pub const DEFAULT_WHITELIST: [&str; 10] = [
    "systemd",
    "init",
    "kthreadd",
    "sshd",
    "Xorg",
    "host-sentinel",
    "csrss.exe",
    "wininit.exe",
    "winlogon.exe",
    "explorer.exe",
];
