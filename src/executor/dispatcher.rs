//! Run request dispatch
//!
//! Issues single-test runs and batch dispatches against the server.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DashboardError, DashboardResult};
use crate::http::DashboardApi;
use crate::models::{ExecutionConfig, ExecutionHandle, TestResult};

/// Sends run requests; holds no per-run state
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn DashboardApi>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> Arc<dyn DashboardApi> {
        self.api.clone()
    }

    /// Run one test synchronously on the server
    ///
    /// Independent of any batch in flight. Callers must not issue a second
    /// run for the same name while one is outstanding.
    pub async fn run_single(&self, name: &str) -> DashboardResult<TestResult> {
        if name.trim().is_empty() {
            return Err(DashboardError::validation("test name must not be empty"));
        }
        debug!("Running single test {}", name);
        self.api.run_test(name).await
    }

    /// Dispatch a batch and return the handle of the new execution
    ///
    /// The config is taken by value: the request is built from this snapshot
    /// and nothing else. An empty test list fails before any request is sent.
    pub async fn execute_batch(&self, config: ExecutionConfig) -> DashboardResult<ExecutionHandle> {
        config.validate()?;

        info!(
            "Dispatching batch of {} tests (concurrency {}, delay {}ms)",
            config.tests.len(),
            config.concurrency,
            config.delay
        );
        let handle = self.api.start_batch(&config).await?;
        info!("Batch accepted as execution {}", handle);
        Ok(handle)
    }
}
