use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use host_sentinel::core::metrics::ProcessInfo;
use host_sentinel::error::{BackendError, BackendResult, Error, Result};
use host_sentinel::source::RawSample;
use host_sentinel::traits::{ActionExecutor, MetricBackend};
use parking_lot::Mutex;

/// Backend that replays a script of values, one per call.
///
/// `None` entries fail the call. Once the script runs out the last entry
/// repeats.
pub struct ScriptedBackend {
    name: String,
    metric: String,
    script: Mutex<VecDeque<Option<f64>>>,
    processes: Option<Vec<ProcessInfo>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(name: &str, metric: &str, script: &[Option<f64>]) -> Self {
        Self {
            name: name.to_string(),
            metric: metric.to_string(),
            script: Mutex::new(script.iter().copied().collect()),
            processes: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend whose every call fails
    pub fn failing(name: &str, metric: &str) -> Self {
        Self::new(name, metric, &[None])
    }

    /// Backend that reports the same value forever
    pub fn constant(name: &str, metric: &str, value: f64) -> Self {
        Self::new(name, metric, &[Some(value)])
    }

    pub fn with_processes(mut self, processes: Vec<ProcessInfo>) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn next(&self) -> Option<f64> {
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        }
    }
}

#[async_trait]
impl MetricBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn sample(&self) -> BackendResult<RawSample> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = self.next().ok_or_else(|| BackendError::ToolMissing(self.name.clone()))?;
        let sample = RawSample::new().with_value(self.metric.as_str(), value);
        Ok(match &self.processes {
            Some(processes) => sample.with_processes(processes.clone()),
            None => sample,
        })
    }
}

/// Executor that records every call instead of touching the host
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    pub reniced: Arc<Mutex<Vec<(u32, i32)>>>,
    pub reclaims: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that records calls and then reports them as failed
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    fn outcome(&self, action: &str, target: String) -> Result<()> {
        if self.fail {
            Err(Error::ActionFailed { action: action.to_string(), target, reason: "permission denied".to_string() })
        } else {
            Ok(())
        }
    }
}

impl ActionExecutor for RecordingExecutor {
    fn lower_priority(&self, pid: u32, increment: i32) -> Result<()> {
        self.reniced.lock().push((pid, increment));
        self.outcome("lower_priority", pid.to_string())
    }

    fn reclaim_memory(&self) -> Result<()> {
        self.reclaims.fetch_add(1, Ordering::SeqCst);
        self.outcome("reclaim_memory", "host".to_string())
    }
}
