//! Console sink
//!
//! Renders log entries and results as they arrive. Polled snapshots repeat
//! results already printed, so only the new tail of each snapshot is written.
//! Overlapping polls can deliver an older, shorter snapshot after a newer one;
//! such a snapshot prints nothing.

use chrono::Local;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use super::formatter::ResultFormatter;
use crate::models::{LogMessage, TestResult};
use crate::results::{ExecutionSummary, LogSink, ResultSink};

struct ConsoleState {
    out: Box<dyn Write + Send>,
    printed: usize,
    summary: Option<ExecutionSummary>,
}

/// Writes formatted output to stdout or any writer
pub struct ConsoleSink {
    formatter: ResultFormatter,
    state: Mutex<ConsoleState>,
}

impl ConsoleSink {
    pub fn stdout(formatter: ResultFormatter) -> Self {
        Self::with_writer(formatter, std::io::stdout())
    }

    pub fn with_writer(formatter: ResultFormatter, out: impl Write + Send + 'static) -> Self {
        Self {
            formatter,
            state: Mutex::new(ConsoleState {
                out: Box::new(out),
                printed: 0,
                summary: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The most recent snapshot summary, if any
    pub fn last_summary(&self) -> Option<ExecutionSummary> {
        self.state().summary.clone()
    }

    /// Print the most recent snapshot summary
    pub fn print_summary(&self) {
        let mut state = self.state();
        if let Some(summary) = state.summary.clone() {
            let text = self.formatter.format_summary(&summary);
            write_line(&mut state, &text);
        }
    }
}

fn write_line(state: &mut ConsoleState, text: &str) {
    // Output is best effort; a closed stdout must not take the session down.
    if let Err(e) = writeln!(state.out, "{text}").and_then(|_| state.out.flush()) {
        tracing::debug!("Console write failed: {}", e);
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, message: LogMessage) {
        let text = self.formatter.format_log(&message, Local::now());
        write_line(&mut self.state(), &text);
    }
}

impl ResultSink for ConsoleSink {
    fn on_result(&self, result: &TestResult) {
        let text = self.formatter.format_result(result);
        write_line(&mut self.state(), &text);
    }

    fn on_snapshot(&self, summary: &ExecutionSummary, results: &[TestResult]) {
        let mut state = self.state();
        if results.len() < state.printed {
            return;
        }
        for result in &results[state.printed..] {
            let text = self.formatter.format_result(result);
            write_line(&mut state, &text);
        }
        state.printed = results.len();
        state.summary = Some(summary.clone());
    }

    fn clear(&self) {
        let mut state = self.state();
        state.printed = 0;
        state.summary = None;
    }
}
