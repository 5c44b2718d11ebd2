//! Typed progress events and the serialized callback sink.
//!
//! GUI and CLI wrappers attach one callback; every emission across all
//! workers is serialized through a single mutex so consumers never see
//! interleaved events. Callbacks run synchronously on the emitting worker
//! and must not block.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Migration phase for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Plan,
    Ddl,
    Data,
    Post,
    Done,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Connect => "connect",
            Phase::Plan => "plan",
            Phase::Ddl => "ddl",
            Phase::Data => "data",
            Phase::Post => "post",
            Phase::Done => "done",
            Phase::Error => "error",
        };
        f.write_str(s)
    }
}

/// A progress event delivered to the registered callback.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub table: Option<String>,
    pub rows_done: Option<u64>,
    pub rows_total: Option<u64>,
    pub message: String,
}

impl ProgressEvent {
    pub fn phase(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            table: None,
            rows_done: None,
            rows_total: None,
            message: message.into(),
        }
    }

    pub fn table(phase: Phase, table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase,
            table: Some(table.into()),
            rows_done: None,
            rows_total: None,
            message: message.into(),
        }
    }

    pub fn data(
        table: impl Into<String>,
        rows_done: u64,
        rows_total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase: Phase::Data,
            table: Some(table.into()),
            rows_done: Some(rows_done),
            rows_total,
            message: message.into(),
        }
    }
}

type Callback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Serialized progress sink shared by the orchestrator and its workers.
#[derive(Clone, Default)]
pub struct ProgressSink {
    callback: Arc<Mutex<Option<Callback>>>,
}

impl ProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the callback; replaces any previous one.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let mut guard = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Box::new(callback));
    }

    /// Emit one event. Serialized: the mutex is held for the duration of
    /// the callback.
    pub fn emit(&self, event: ProgressEvent) {
        let guard = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(callback) = guard.as_ref() {
            callback(&event);
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_without_callback_is_noop() {
        let sink = ProgressSink::new();
        sink.emit(ProgressEvent::phase(Phase::Connect, "connecting"));
    }

    #[test]
    fn test_emit_reaches_callback() {
        let sink = ProgressSink::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let count_cb = count.clone();
        let seen_cb = seen.clone();
        sink.set_callback(move |event| {
            count_cb.fetch_add(1, Ordering::SeqCst);
            seen_cb.lock().unwrap().push(event.message.clone());
        });

        sink.emit(ProgressEvent::phase(Phase::Plan, "planning"));
        sink.emit(ProgressEvent::data("users", 1000, Some(5000), "copying"));

        assert_eq!(count.load(Ordering::SeqCst), 2);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &["planning", "copying"]);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Connect.to_string(), "connect");
        assert_eq!(Phase::Ddl.to_string(), "ddl");
        assert_eq!(Phase::Done.to_string(), "done");
    }

    #[test]
    fn test_clone_shares_callback() {
        let sink = ProgressSink::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        sink.set_callback(move |_| {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });

        let clone = sink.clone();
        clone.emit(ProgressEvent::phase(Phase::Data, "tick"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
