//! HTTP client for the execution server
//!
//! Implements [`DashboardApi`] over reqwest: JSON request/response calls for
//! single runs, batch dispatch and status polls, and an event-stream response
//! for the log channel.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header, Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::sse::event_stream;
use crate::error::{DashboardError, DashboardResult};
use crate::models::{BatchAccepted, Execution, ExecutionConfig, ExecutionHandle, TestResult};

/// Stream of raw log event payloads for one execution
pub type LogEventStream = BoxStream<'static, DashboardResult<String>>;

/// The server contract consumed by the orchestrator
#[async_trait]
pub trait DashboardApi: Send + Sync + 'static {
    /// `POST /run/{name}`
    async fn run_test(&self, name: &str) -> DashboardResult<TestResult>;

    /// `POST /batch`
    async fn start_batch(&self, config: &ExecutionConfig) -> DashboardResult<ExecutionHandle>;

    /// `GET /execution/{id}`
    async fn fetch_execution(&self, handle: &ExecutionHandle) -> DashboardResult<Execution>;

    /// `GET /logs/{id}`
    async fn open_log_stream(&self, handle: &ExecutionHandle) -> DashboardResult<LogEventStream>;
}

/// reqwest-backed API client
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create a client for `base_url` (scheme, host and API prefix)
    pub fn new(base_url: impl Into<String>) -> DashboardResult<Self> {
        Self::with_timeout(base_url, 30)
    }

    /// Create client with custom timeout for non-streaming calls
    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> DashboardResult<Self> {
        // No overall timeout on the client itself: the log stream is long-lived.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DashboardError::network("Client setup", e.to_string()))?;

        let base_url = base_url.into();
        let parsed = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            DashboardError::validation(format!("invalid server URL {base_url}: {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(DashboardError::validation(format!(
                "invalid server URL {base_url}: not a base URL"
            )));
        }

        Ok(Self {
            client,
            base_url: parsed,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append percent-encoded path segments to the base URL
    fn build_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> DashboardResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DashboardError::network(
                    operation,
                    format!("timeout after {} seconds", self.timeout_secs),
                )
            } else if e.is_connect() {
                DashboardError::network(operation, format!("connection refused: {e}"))
            } else {
                DashboardError::network(operation, e.to_string())
            }
        })?;

        let status = response.status();
        debug!("{} -> {}", operation, status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Server {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> DashboardResult<T> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let response = self.send(operation, request.timeout(timeout)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::network(operation, e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| DashboardError::malformed(format!("{operation} response"), e))
    }
}

#[async_trait]
impl DashboardApi for HttpClient {
    async fn run_test(&self, name: &str) -> DashboardResult<TestResult> {
        let url = self.build_url(&["run", name]);
        debug!("Sending single run request to {}", url);
        self.json("Single run", self.client.post(url)).await
    }

    async fn start_batch(&self, config: &ExecutionConfig) -> DashboardResult<ExecutionHandle> {
        let url = self.build_url(&["batch"]);
        debug!("Dispatching batch of {} tests to {}", config.tests.len(), url);
        let accepted: BatchAccepted = self
            .json("Batch dispatch", self.client.post(url).json(config))
            .await?;
        Ok(accepted.execution_id)
    }

    async fn fetch_execution(&self, handle: &ExecutionHandle) -> DashboardResult<Execution> {
        let url = self.build_url(&["execution", handle.as_str()]);
        self.json("Status poll", self.client.get(url)).await
    }

    async fn open_log_stream(&self, handle: &ExecutionHandle) -> DashboardResult<LogEventStream> {
        let url = self.build_url(&["logs", handle.as_str()]);
        debug!("Opening log stream {}", url);
        let request = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/event-stream");
        let response = self
            .send("Log stream", request)
            .await
            .map_err(|e| DashboardError::StreamTransport(e.to_string()))?;

        Ok(event_stream(response.bytes_stream().boxed()))
    }
}
