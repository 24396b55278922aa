//! Usage event recording for usability evaluation.
//!
//! Events flow through an injectable [`EventSink`] rather than any global
//! buffer, so each test (and each server instance) gets an isolated sink.
//! The default sink writes structured lines through [`crate::hlog!`]; a
//! buffering in-memory sink is provided for assertions.

use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// A single recorded usage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UsageEvent {
    TaskCompletion {
        task: String,
        duration_ms: u64,
        success: bool,
    },
    ScreenView {
        screen: String,
    },
    Interaction {
        action: String,
        element: String,
    },
    Error {
        kind: String,
        message: String,
    },
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: UsageEvent);
}

/// Sink that emits every event as a structured log line.
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: UsageEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => crate::hlog!("usage: {}", json),
            Err(e) => crate::hlog!("usage: unserializable event: {}", e),
        }
    }
}

/// Sink that buffers events in memory for test assertions.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<UsageEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<UsageEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: UsageEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Measures a task from creation to [`TaskTimer::finish`], recording a
/// [`UsageEvent::TaskCompletion`] with the elapsed time.
pub struct TaskTimer {
    task: String,
    started: Instant,
}

impl TaskTimer {
    pub fn start(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            started: Instant::now(),
        }
    }

    pub fn finish(self, sink: &dyn EventSink, success: bool) {
        sink.record(UsageEvent::TaskCompletion {
            task: self.task,
            duration_ms: self.started.elapsed().as_millis() as u64,
            success,
        });
    }
}
