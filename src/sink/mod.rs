//! Event sinks
//!
//! Everything the sampler produces leaves through a [`Sink`] as a
//! [`SinkEvent`]: readings (when enabled), severity transitions, Unknown and
//! Restored notices, backend switches and action records. Sinks run on the
//! evaluation path, so every implementation here returns without waiting on
//! a consumer.

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use crate::core::metrics::{serialize_epoch_millis, Reading};
use crate::core::types::{Resource, Severity};
use crate::error::Result;
use crate::evaluator::{RestoredEvent, TransitionEvent, UnknownEvent};
use crate::policy::{ActionKind, ActionRecord, ActionResult};
use crate::source::BackendSwitch;
use crate::traits::Sink;

/// Default buffer of a [`BroadcastSink`] channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// A source moved between backends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendChange {
    pub resource: Resource,
    pub from: Option<String>,
    pub to: String,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
}

impl BackendChange {
    pub fn new(resource: Resource, switch: &BackendSwitch, timestamp: SystemTime) -> Self {
        Self { resource, from: switch.from.clone(), to: switch.to.clone(), timestamp }
    }
}

/// Everything the sampler reports to the outside
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkEvent {
    Reading(Reading),
    Transition(TransitionEvent),
    Unknown(UnknownEvent),
    Restored(RestoredEvent),
    BackendDegraded(BackendChange),
    BackendRestored(BackendChange),
    Action(ActionRecord),
}

impl SinkEvent {
    pub fn timestamp(&self) -> SystemTime {
        match self {
            SinkEvent::Reading(r) => r.timestamp,
            SinkEvent::Transition(t) => t.timestamp,
            SinkEvent::Unknown(u) => u.timestamp,
            SinkEvent::Restored(r) => r.timestamp,
            SinkEvent::BackendDegraded(c) | SinkEvent::BackendRestored(c) => c.timestamp,
            SinkEvent::Action(a) => a.timestamp,
        }
    }

    /// Name of the `kind` tag this event serializes with
    pub fn kind(&self) -> &'static str {
        match self {
            SinkEvent::Reading(_) => "reading",
            SinkEvent::Transition(_) => "transition",
            SinkEvent::Unknown(_) => "unknown",
            SinkEvent::Restored(_) => "restored",
            SinkEvent::BackendDegraded(_) => "backend_degraded",
            SinkEvent::BackendRestored(_) => "backend_restored",
            SinkEvent::Action(_) => "action",
        }
    }
}

/// Renders events as structured log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn emit(&self, event: &SinkEvent) {
        match event {
            SinkEvent::Reading(r) => {
                trace!(metric = %r.metric, value = r.value, unit = %r.unit, backend = %r.backend, "Reading")
            }
            SinkEvent::Transition(t) if t.new_severity > Severity::Normal && t.is_escalation() => warn!(
                metric = %t.metric,
                from = %t.old_severity,
                to = %t.new_severity,
                value = t.value,
                "Severity escalated"
            ),
            SinkEvent::Transition(t) => info!(
                metric = %t.metric,
                from = %t.old_severity,
                to = %t.new_severity,
                value = t.value,
                "Severity recovered"
            ),
            SinkEvent::Unknown(u) => warn!(
                metric = %u.metric,
                last_severity = %u.last_severity,
                missed = u.consecutive_unavailable,
                reason = %u.reason,
                "Metric unknown"
            ),
            SinkEvent::Restored(r) => info!(metric = %r.metric, missed = r.missed_ticks, "Metric available again"),
            SinkEvent::BackendDegraded(c) => {
                warn!(resource = %c.resource, backend = %c.to, from = ?c.from, "Backend degraded")
            }
            SinkEvent::BackendRestored(c) => info!(resource = %c.resource, backend = %c.to, "Backend restored"),
            SinkEvent::Action(a) => match &a.result {
                ActionResult::Failed(reason) => {
                    error!(action = %a.kind, metric = %a.metric, subject = %a.target, reason = %reason, "Action failed")
                }
                _ if a.kind == ActionKind::Log => debug!(metric = %a.metric, detail = %a.detail, "Action logged"),
                result => info!(action = %a.kind, metric = %a.metric, subject = %a.target, result = ?result, "Action"),
            },
        }
    }
}

/// Publishes events on a tokio broadcast channel.
///
/// Events are dropped when nobody subscribes; slow subscribers see
/// `RecvError::Lagged` instead of holding up the sampler.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<SinkEvent>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Sink for BroadcastSink {
    fn emit(&self, event: &SinkEvent) {
        // an error only means there are no receivers
        let _ = self.sender.send(event.clone());
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events collected so far
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Removes and returns the events collected so far
    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn transitions(&self) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Transition(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Action(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Sink for CollectingSink {
    fn emit(&self, event: &SinkEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<LineWriter<File>> {
    /// Appends to `path`, creating the file if needed
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path.as_ref())?;
        Ok(Self::new(LineWriter::new(file)))
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn emit(&self, event: &SinkEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "Failed to serialize event");
                return;
            }
        };
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(kind = event.kind(), error = %e, "Failed to write event");
        }
    }
}

/// Forwards every event to several sinks in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink").field("sinks", &self.sinks.len()).finish()
    }
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn with_arc(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for FanoutSink {
    fn emit(&self, event: &SinkEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
