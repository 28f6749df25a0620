//! Execution models
//!
//! Batch configuration, the handle returned on dispatch, the polled execution
//! snapshot and the log events pushed over the stream.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::test_result::TestResult;
use crate::error::{DashboardError, DashboardResult};

/// Opaque identifier of one server-side batch run
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of one batch dispatch; also the `POST /batch` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub tests: Vec<String>,
    pub concurrency: u32,
    /// Delay between test starts, in milliseconds
    pub delay: u64,
}

impl ExecutionConfig {
    pub fn new(tests: Vec<String>, concurrency: u32, delay: u64) -> Self {
        Self {
            tests,
            concurrency,
            delay,
        }
    }

    pub fn validate(&self) -> DashboardResult<()> {
        if self.tests.is_empty() {
            return Err(DashboardError::validation(
                "select at least one test to run as a batch",
            ));
        }
        if self.concurrency == 0 {
            return Err(DashboardError::validation("concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Response of `POST /batch`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchAccepted {
    pub execution_id: ExecutionHandle,
}

/// Server-side lifecycle of an execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Full snapshot of an execution, replaced wholesale on every poll
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub success_count: usize,
    #[serde(default)]
    pub failure_count: usize,
    #[serde(default)]
    pub total_tests: usize,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<TestResult>,
}

impl Execution {
    pub fn new(id: impl Into<String>, status: ExecutionStatus, total_tests: usize) -> Self {
        Self {
            id: id.into(),
            status,
            success_count: 0,
            failure_count: 0,
            total_tests,
            results: Vec::new(),
        }
    }

    pub fn with_results(mut self, results: Vec<TestResult>) -> Self {
        self.success_count = results.iter().filter(|r| r.status.is_success()).count();
        self.failure_count = results.len() - self.success_count;
        self.results = results;
        self
    }
}

// The server encodes an empty result list as `null` before the first test finishes.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Severity of a log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Failure,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Failure => write!(f, "failure"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One operator-facing log line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Parse one JSON-encoded stream event
    pub fn parse(payload: &str) -> DashboardResult<Self> {
        serde_json::from_str(payload).map_err(|e| DashboardError::malformed("log event", e))
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let empty = ExecutionConfig::new(vec![], 2, 0);
        let err = empty.validate().unwrap_err();
        assert!(err.is_validation());

        let zero = ExecutionConfig::new(vec!["a".into()], 0, 0);
        assert!(zero.validate().unwrap_err().is_validation());

        assert!(ExecutionConfig::new(vec!["a".into()], 1, 250).validate().is_ok());
    }

    #[test]
    fn test_config_wire_format() {
        let config = ExecutionConfig::new(vec!["b".into(), "a".into()], 2, 100);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tests": ["b", "a"], "concurrency": 2, "delay": 100})
        );
    }

    #[test]
    fn test_batch_accepted() {
        let accepted: BatchAccepted =
            serde_json::from_str(r#"{"execution_id":"exec-1"}"#).unwrap();
        assert_eq!(accepted.execution_id, ExecutionHandle::new("exec-1"));
    }

    #[test]
    fn test_execution_null_results() {
        let json = r#"{"id":"e1","status":"pending","success_count":0,"failure_count":0,"total_tests":3,"results":null}"#;
        let execution: Execution = serde_json::from_str(json).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert!(execution.results.is_empty());
        assert_eq!(execution.total_tests, 3);
    }

    #[test]
    fn test_execution_status_terminal() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
    }

    #[test]
    fn test_log_message_parse() {
        let msg = LogMessage::parse(r#"{"level":"success","message":"done"}"#).unwrap();
        assert_eq!(msg, LogMessage::new(LogLevel::Success, "done"));

        let warn = LogMessage::parse(r#"{"level":"warn","message":"slow"}"#).unwrap();
        assert_eq!(warn.level, LogLevel::Warning);

        let err = LogMessage::parse("not json").unwrap_err();
        assert!(matches!(err, DashboardError::MalformedPayload { .. }));
        assert!(LogMessage::parse(r#"{"level":"loud","message":"x"}"#).is_err());
    }
}
