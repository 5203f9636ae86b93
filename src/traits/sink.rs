use crate::sink::SinkEvent;

/// Consumer of the event stream (log writer, API cache, service wrapper).
///
/// `emit` is called from the evaluation path and must not block; sinks that
/// do slow IO should buffer or hand the event to a channel.
pub trait Sink: Send + Sync {
    fn emit(&self, event: &SinkEvent);
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn emit(&self, event: &SinkEvent) {
        (**self).emit(event)
    }
}
