use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::trace;

use super::constants::*;
use crate::error::{BackendError, BackendResult};
use crate::source::RawSample;
use crate::traits::MetricBackend;

/// Mean and sample standard deviation of the attempt times
pub fn latency_stats(samples: &[f64]) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let jitter = if samples.len() > 1 {
        (samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    Some((mean, jitter))
}

/// Latency to one `host:port` target via TCP connect time
#[derive(Debug, Clone)]
pub struct TcpConnectBackend {
    target: String,
    name: String,
    attempts: usize,
    attempt_timeout: Duration,
}

impl TcpConnectBackend {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self { name: format!("tcp-connect {target}"), target, attempts: PROBE_ATTEMPTS, attempt_timeout: ATTEMPT_TIMEOUT }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Connect time in milliseconds, or the failure
    async fn attempt(&self) -> BackendResult<f64> {
        let started = Instant::now();
        match tokio::time::timeout(self.attempt_timeout, TcpStream::connect(self.target.as_str())).await {
            Ok(Ok(_stream)) => Ok(started.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => Err(BackendError::Io(e)),
            Err(_) => Err(BackendError::Timeout(self.attempt_timeout)),
        }
    }
}

#[async_trait]
impl MetricBackend for TcpConnectBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> bool {
        tokio::net::lookup_host(self.target.as_str()).await.is_ok_and(|mut addrs| addrs.next().is_some())
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        let mut times = Vec::with_capacity(self.attempts);
        let mut last_error = None;
        for _ in 0..self.attempts {
            match self.attempt().await {
                Ok(ms) => times.push(ms),
                Err(e) => {
                    trace!(addr = %self.target, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        if times.is_empty() {
            return Err(last_error.unwrap_or_else(|| BackendError::parse("no connect attempts")));
        }
        times.resize(self.attempts, FAILED_ATTEMPT_MS);
        let (latency, jitter) = latency_stats(&times).ok_or_else(|| BackendError::parse("no connect attempts"))?;
        Ok(RawSample::new().with_value(NET_LATENCY_MS, latency).with_value(NET_JITTER_MS, jitter))
    }
}
