use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::core::metrics::serialize_epoch_millis;
use crate::monitor::EvaluationCounts;

/// Phase of the sample loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Sampling,
    Evaluating,
}

impl LoopState {
    fn as_u8(self) -> u8 {
        match self {
            LoopState::Idle => 0,
            LoopState::Sampling => 1,
            LoopState::Evaluating => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Sampling,
            2 => LoopState::Evaluating,
            _ => LoopState::Idle,
        }
    }
}

/// Cloneable control handle of a [`SampleLoop`](super::SampleLoop)
#[derive(Debug, Clone)]
pub struct LoopHandle {
    paused: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
}

impl Default for LoopHandle {
    fn default() -> Self {
        Self { paused: Arc::new(AtomicBool::new(false)), state: Arc::new(AtomicU8::new(LoopState::Idle.as_u8())) }
    }
}

impl LoopHandle {
    /// Skip ticks until resumed. A tick already running completes.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume on the next tick; skipped ticks are not replayed
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub started_at: SystemTime,
    pub duration: Duration,
    /// The loop was paused and nothing was sampled
    pub skipped: bool,
    pub sources_sampled: usize,
    pub sources_unavailable: usize,
    pub counts: EvaluationCounts,
}

impl TickReport {
    pub(crate) fn skipped(started_at: SystemTime) -> Self {
        Self {
            started_at,
            duration: Duration::ZERO,
            skipped: true,
            sources_sampled: 0,
            sources_unavailable: 0,
            counts: EvaluationCounts::default(),
        }
    }
}
