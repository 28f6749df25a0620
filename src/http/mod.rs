//! HTTP access to the execution server
//!
//! Provides the server contract trait, its reqwest implementation and the
//! event-stream decoder used by the log channel.

mod client;
pub mod sse;

pub use client::{DashboardApi, HttpClient, LogEventStream};
