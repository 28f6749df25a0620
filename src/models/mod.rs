//! Data models for the dashboard orchestrator
//!
//! This module contains all data structures exchanged with the execution server.

mod execution;
mod test_result;

pub use execution::{
    BatchAccepted, Execution, ExecutionConfig, ExecutionHandle, ExecutionStatus, LogLevel,
    LogMessage,
};
pub use test_result::{ResultStatus, TestDescriptor, TestResult};
