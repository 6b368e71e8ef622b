//! Invalidation notifications
//!
//! After each drain batch that changed the track, the worker reports the
//! earliest affected presentation time. The call is made with the track lock
//! released, so a sink may take the track lock itself.

use parking_lot::Mutex;

use crate::sample::Timestamp;

/// Receiver of "re-render from `at` onward" notifications.
pub trait InvalidationSink<S: ?Sized>: Send + Sync + 'static {
    fn invalidate(&self, at: Timestamp, track: &S);
}

impl<S: ?Sized, F> InvalidationSink<S> for F
where
    F: Fn(Timestamp, &S) + Send + Sync + 'static,
{
    fn invalidate(&self, at: Timestamp, track: &S) {
        self(at, track)
    }
}

/// Sink that discards notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<S: ?Sized> InvalidationSink<S> for NullSink {
    fn invalidate(&self, _at: Timestamp, _track: &S) {}
}

/// Sink that records every notification, in call order
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Timestamp>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Timestamp> {
        self.calls.lock().clone()
    }
}

impl<S: ?Sized> InvalidationSink<S> for RecordingSink {
    fn invalidate(&self, at: Timestamp, _track: &S) {
        self.calls.lock().push(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(AtomicI64::new(-1));
        let sink = {
            let seen = Arc::clone(&seen);
            move |at: Timestamp, _track: &()| seen.store(at, Ordering::SeqCst)
        };

        sink.invalidate(42, &());
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        InvalidationSink::<()>::invalidate(&sink, 5, &());
        InvalidationSink::<()>::invalidate(&sink, 3, &());
        assert_eq!(sink.calls(), vec![5, 3]);
    }
}
