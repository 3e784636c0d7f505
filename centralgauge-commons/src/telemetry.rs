//! Generic telemetry sink, decoupled from any particular event schema so
//! the agent, sandbox, and analysis crates can each define their own event
//! enum without depending on one another.

/// A lightweight sink used to record telemetry/events emitted by a
/// component. Each publish call hands the sink a borrowed event so
/// listeners never need to clone it.
pub trait TelemetrySink<Event>: Send + Sync {
    /// Record an event. Implementations MUST NOT let listener panics
    /// propagate into the publisher - wrap fallible listener bodies in
    /// `catch_unwind` if they can panic.
    fn record(&self, event: &Event);
}

/// A telemetry sink that discards every event. Useful in tests and for
/// callers that have not wired a listener yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl<Event> TelemetrySink<Event> for NoopTelemetry {
    fn record(&self, _event: &Event) {}
}

/// An in-memory sink that appends every event to a `Vec`, used throughout
/// the test suites for the agent executor and verify orchestrator.
#[derive(Default)]
pub struct RecordingTelemetry<Event> {
    events: parking_lot_like::Mutex<Vec<Event>>,
}

// Avoid a hard dependency on `parking_lot` from this leaf crate; a tiny
// std-backed mutex module keeps the public API identical to the rest of
// the workspace's lock usage.
mod parking_lot_like {
    use std::sync::Mutex as StdMutex;

    pub struct Mutex<T>(StdMutex<T>);

    impl<T: Default> Default for Mutex<T> {
        fn default() -> Self {
            Self(StdMutex::new(T::default()))
        }
    }

    impl<T> Mutex<T> {
        pub fn lock(&self) -> std::sync::MutexGuard<'_, T> {
            match self.0.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }
}

impl<Event: Clone> RecordingTelemetry<Event> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl<Event: Clone + Send + Sync> TelemetrySink<Event> for RecordingTelemetry<Event> {
    fn record(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}
