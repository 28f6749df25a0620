//! Output formatters for log entries and results
//!
//! Provides table (optionally colorized), JSON and pretty JSON output.

use chrono::{DateTime, Local, Utc};

use crate::models::{LogLevel, LogMessage, ResultStatus, TestResult};
use crate::results::ExecutionSummary;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            _ => None,
        }
    }
}

/// Result formatter
#[derive(Clone, Debug)]
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.colorize {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Format a log entry stamped with the local time `at`
    pub fn format_log(&self, message: &LogMessage, at: DateTime<Local>) -> String {
        match self.format {
            OutputFormat::Table => {
                let code = match message.level {
                    LogLevel::Info => "36",
                    LogLevel::Success => "32",
                    LogLevel::Failure | LogLevel::Error => "31",
                    LogLevel::Warning => "33",
                };
                format!(
                    "[{}] {} {}",
                    at.format("%H:%M:%S"),
                    self.paint(code, &format!("{:7}", message.level.to_string())),
                    message.message
                )
            }
            OutputFormat::Json => serde_json::to_string(message).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(message).unwrap_or_default(),
        }
    }

    /// Format a single test result
    pub fn format_result(&self, result: &TestResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
        }
    }

    fn format_result_table(&self, result: &TestResult) -> String {
        let label = format!("{} {}", result.status.symbol(), result.status);
        let status_str = match result.status {
            ResultStatus::Success => self.paint("32", &label),
            ResultStatus::Failure | ResultStatus::Error => self.paint("31", &label),
        };
        let http = result
            .http_status
            .map(|code| format!(" (HTTP {code})"))
            .unwrap_or_default();

        let mut line = format!(
            "{:30} {}{} [{:>6}ms] {}",
            result.test_name,
            status_str,
            http,
            result.duration_ms,
            local_time(result.timestamp).format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(err) = &result.error {
            line.push_str(&format!("\n    Error: {err}"));
        }
        line
    }

    /// Format a polled execution summary
    pub fn format_summary(&self, summary: &ExecutionSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
        }
    }

    fn format_summary_table(&self, summary: &ExecutionSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Execution {:30} [{:9}]          ║\n",
            summary.id,
            summary.status.to_string()
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        let success = self.paint("32", &format!("{:3}", summary.success_count));
        let failure = if summary.failure_count > 0 {
            self.paint("31", &format!("{:3}", summary.failure_count))
        } else {
            format!("{:3}", summary.failure_count)
        };
        output.push_str(&format!(
            "║  Success: {} | Failure: {} | Total: {:3} | Done: {:5.1}%       ║\n",
            success,
            failure,
            summary.total_tests,
            summary.progress()
        ));
        output.push_str(&format!(
            "║  Errors: {:3} | Max: {:6}ms | Avg: {:6}ms | Samples: {:3}    ║\n",
            summary.stats.error_count,
            summary.stats.max_duration_ms,
            summary.stats.avg_duration_ms(),
            summary.stats.sample_count
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn local_time(ts: DateTime<Utc>) -> DateTime<Local> {
    ts.with_timezone(&Local)
}
