//! Sinks receiving operator-facing output
//!
//! The orchestrator never renders anything itself; it hands log entries and
//! result snapshots to these traits.

use std::sync::{Arc, Mutex, MutexGuard};

use super::aggregator::ExecutionSummary;
use crate::models::{LogMessage, TestResult};

/// Receives log entries, from both the session and the server stream
pub trait LogSink: Send + Sync {
    fn log(&self, message: LogMessage);
}

/// Receives results for display
pub trait ResultSink: Send + Sync {
    /// A single-run result, appended to whatever is displayed
    fn on_result(&self, result: &TestResult);

    /// A polled snapshot, replacing whatever is displayed
    fn on_snapshot(&self, summary: &ExecutionSummary, results: &[TestResult]);

    /// Called before a new batch starts
    fn clear(&self) {}
}

#[derive(Debug, Default)]
struct MemoryState {
    logs: Vec<LogMessage>,
    results: Vec<TestResult>,
    summary: Option<ExecutionSummary>,
    snapshots: usize,
}

/// In-memory sink recording everything it receives
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking sink caller must not take the recorded output with it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn logs(&self) -> Vec<LogMessage> {
        self.state().logs.clone()
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.state().results.clone()
    }

    pub fn summary(&self) -> Option<ExecutionSummary> {
        self.state().summary.clone()
    }

    pub fn snapshot_count(&self) -> usize {
        self.state().snapshots
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: LogMessage) {
        self.state().logs.push(message);
    }
}

impl ResultSink for MemorySink {
    fn on_result(&self, result: &TestResult) {
        self.state().results.push(result.clone());
    }

    fn on_snapshot(&self, summary: &ExecutionSummary, results: &[TestResult]) {
        let mut state = self.state();
        state.results = results.to_vec();
        state.summary = Some(summary.clone());
        state.snapshots += 1;
    }

    fn clear(&self) {
        *self.state() = MemoryState::default();
    }
}
