use std::time::Duration;

/// Mean TCP connect time in milliseconds
pub const NET_LATENCY_MS: &str = "net.latency_ms";
/// Sample standard deviation of the connect times in milliseconds
pub const NET_JITTER_MS: &str = "net.jitter_ms";

/// Connect attempts per sample
pub const PROBE_ATTEMPTS: usize = 3;
/// Limit for a single connect attempt
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);
/// Latency charged for an attempt that failed or timed out
pub const FAILED_ATTEMPT_MS: f64 = 1000.0;

pub(crate) const SOURCE_TIMEOUT_MARGIN: Duration = Duration::from_millis(500);
