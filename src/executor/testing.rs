//! Scripted in-memory server used by the executor tests

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use crate::error::{DashboardError, DashboardResult};
use crate::http::{DashboardApi, LogEventStream};
use crate::models::{Execution, ExecutionConfig, ExecutionHandle, ExecutionStatus, TestResult};

/// Log stream fed by the test through [`ScriptedApi::push_log`]
struct TrackedStream {
    rx: mpsc::UnboundedReceiver<DashboardResult<String>>,
    drops: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = DashboardResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct ScriptedApi {
    runs: Mutex<HashMap<String, DashboardResult<TestResult>>>,
    polls: Mutex<VecDeque<DashboardResult<Execution>>>,
    last_poll: Mutex<Option<DashboardResult<Execution>>>,
    poll_delay: Mutex<Option<Duration>>,
    batch_error: Mutex<Option<DashboardError>>,
    stream_error: Mutex<Option<DashboardError>>,
    batch_gate: Mutex<Option<Arc<Semaphore>>>,
    log_tx: Mutex<Option<mpsc::UnboundedSender<DashboardResult<String>>>>,
    pub run_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub stream_opens: AtomicUsize,
    pub stream_drops: Arc<AtomicUsize>,
    pub batches: Mutex<Vec<ExecutionConfig>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_run(&self, name: &str, result: DashboardResult<TestResult>) {
        self.runs.lock().unwrap().insert(name.to_string(), result);
    }

    /// Queue poll responses; the last one repeats once the queue is drained
    pub fn queue_polls(&self, responses: Vec<DashboardResult<Execution>>) {
        self.polls.lock().unwrap().extend(responses);
    }

    pub fn queue_statuses(&self, statuses: &[ExecutionStatus]) {
        self.queue_polls(
            statuses
                .iter()
                .map(|s| Ok(Execution::new("exec-1", *s, 3)))
                .collect(),
        );
    }

    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_batch(&self, err: DashboardError) {
        *self.batch_error.lock().unwrap() = Some(err);
    }

    /// Make `start_batch` wait until [`release_batches`](Self::release_batches)
    pub fn hold_batches(&self) {
        *self.batch_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_batches(&self, count: usize) {
        if let Some(gate) = self.batch_gate.lock().unwrap().as_ref() {
            gate.add_permits(count);
        }
    }

    pub fn fail_stream(&self, err: DashboardError) {
        *self.stream_error.lock().unwrap() = Some(err);
    }

    pub fn push_log(&self, payload: &str) {
        self.send_log(Ok(payload.to_string()));
    }

    pub fn send_log(&self, item: DashboardResult<String>) {
        if let Some(tx) = self.log_tx.lock().unwrap().as_ref() {
            let _ = tx.send(item);
        }
    }

    /// Close the server side of the log stream
    pub fn end_logs(&self) {
        self.log_tx.lock().unwrap().take();
    }

    pub fn polls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.stream_drops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DashboardApi for ScriptedApi {
    async fn run_test(&self, name: &str) -> DashboardResult<TestResult> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.runs.lock().unwrap().get(name).cloned();
        scripted.unwrap_or_else(|| {
            Err(DashboardError::Server {
                operation: "Single run".into(),
                status: 404,
                body: "test not found".into(),
            })
        })
    }

    async fn start_batch(&self, config: &ExecutionConfig) -> DashboardResult<ExecutionHandle> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batches.lock().unwrap().push(config.clone());
        let gate = self.batch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(err) = self.batch_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ExecutionHandle::new(format!("exec-{call}")))
    }

    async fn fetch_execution(&self, _handle: &ExecutionHandle) -> DashboardResult<Execution> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.poll_delay.lock().unwrap();
        let response = {
            let next = self.polls.lock().unwrap().pop_front();
            let mut last = self.last_poll.lock().unwrap();
            match next {
                Some(response) => {
                    *last = Some(response.clone());
                    response
                }
                None => last
                    .clone()
                    .unwrap_or_else(|| Ok(Execution::new("exec-1", ExecutionStatus::Pending, 0))),
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn open_log_stream(&self, _handle: &ExecutionHandle) -> DashboardResult<LogEventStream> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.stream_error.lock().unwrap().clone() {
            return Err(err);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.log_tx.lock().unwrap() = Some(tx);
        Ok(TrackedStream {
            rx,
            drops: self.stream_drops.clone(),
        }
        .boxed())
    }
}

/// Let spawned tasks run; with a paused clock this advances virtual time
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Advance (virtual) time until `cond` holds, giving up after `max` steps
pub async fn wait_until(mut cond: impl FnMut() -> bool, max: usize) -> bool {
    for _ in 0..max {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cond()
}
