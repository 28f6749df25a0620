//! Test catalog and result models
//!
//! Defines the runnable test descriptor, per-test results and their status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::execution::LogLevel;

/// A runnable test from the externally supplied catalog
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestDescriptor {
    pub name: String,
}

impl TestDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for TestDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TestDescriptor {
    fn from(name: String) -> Self {
        Self { name }
    }
}

/// Outcome reported by the server for one test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failure,
    Error,
}

impl ResultStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ResultStatus::Success => "✓",
            ResultStatus::Failure => "✗",
            ResultStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultStatus::Success)
    }

    /// Log level used when announcing this outcome
    pub fn log_level(&self) -> LogLevel {
        match self {
            ResultStatus::Success => LogLevel::Success,
            ResultStatus::Failure => LogLevel::Failure,
            ResultStatus::Error => LogLevel::Error,
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Success => write!(f, "SUCCESS"),
            ResultStatus::Failure => write!(f, "FAILURE"),
            ResultStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of a single test execution, as produced by the server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub status: ResultStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl TestResult {
    pub fn new(test_name: impl Into<String>, status: ResultStatus, duration_ms: u64) -> Self {
        Self {
            test_name: test_name.into(),
            status,
            duration_ms,
            timestamp: Utc::now(),
            http_status: None,
            error: None,
            response: None,
        }
    }

    pub fn success(test_name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(test_name, ResultStatus::Success, duration_ms)
    }

    pub fn failure(test_name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(test_name, ResultStatus::Failure, duration_ms)
    }

    pub fn error(test_name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(test_name, ResultStatus::Error, 0);
        result.error = Some(error.into());
        result
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// One-line announcement used for log entries: `name: STATUS (Nms)`
    pub fn headline(&self) -> String {
        format!("{}: {} ({}ms)", self.test_name, self.status, self.duration_ms)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.test_name,
            self.duration_ms
        )?;
        if let Some(code) = self.http_status {
            write!(f, " (HTTP {code})")?;
        }
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}
