//! Execution session
//!
//! Owns the single "current execution" slot. A session moves through
//! `Idle -> Dispatching -> Monitoring -> Completed | Abandoned`; the log
//! stream and the status poller for the current handle are created together
//! when monitoring starts and released together when it ends, and every
//! transition goes through the session lock, so a terminal outcome is acted on
//! exactly once no matter which tick reports it first.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{info, warn};

use super::dispatcher::Dispatcher;
use super::poller::{PollObserver, PollOutcome, StatusPoller, DEFAULT_POLL_INTERVAL};
use super::stream::LogStreamConsumer;
use crate::error::{DashboardError, DashboardResult};
use crate::http::DashboardApi;
use crate::models::{ExecutionConfig, ExecutionHandle, LogLevel, LogMessage, TestResult};
use crate::results::{LogSink, ResultSink};

/// Lifecycle of the session's execution slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Dispatching,
    Monitoring(ExecutionHandle),
    Completed(ExecutionHandle),
    /// Polling failed; the stream was closed and the handle released
    Abandoned(ExecutionHandle),
}

impl SessionState {
    /// True while a batch occupies the slot
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Dispatching | SessionState::Monitoring(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Dispatching => write!(f, "dispatching"),
            SessionState::Monitoring(h) => write!(f, "monitoring {h}"),
            SessionState::Completed(h) => write!(f, "completed {h}"),
            SessionState::Abandoned(h) => write!(f, "abandoned {h}"),
        }
    }
}

/// The stream and poller bound to the current handle
struct ActiveExecution {
    handle: ExecutionHandle,
    stream: LogStreamConsumer,
    poller: StatusPoller,
}

impl ActiveExecution {
    fn release(mut self) {
        self.poller.stop();
        self.stream.close();
    }
}

struct SessionInner {
    state: SessionState,
    active: Option<ActiveExecution>,
    /// Bumped by every start and teardown; a dispatch whose generation is
    /// stale by the time it returns is not monitored
    generation: u64,
}

struct SessionShared {
    dispatcher: Dispatcher,
    log_sink: Arc<dyn LogSink>,
    result_sink: Arc<dyn ResultSink>,
    poll_interval: Duration,
    inner: Mutex<SessionInner>,
    running_singles: Mutex<HashSet<String>>,
}

/// Orchestrates single runs and the one monitored batch execution
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ExecutionSession {
    shared: Arc<SessionShared>,
}

impl ExecutionSession {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        log_sink: Arc<dyn LogSink>,
        result_sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self::with_poll_interval(api, log_sink, result_sink, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        api: Arc<dyn DashboardApi>,
        log_sink: Arc<dyn LogSink>,
        result_sink: Arc<dyn ResultSink>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                dispatcher: Dispatcher::new(api),
                log_sink,
                result_sink,
                poll_interval,
                inner: Mutex::new(SessionInner {
                    state: SessionState::Idle,
                    active: None,
                    generation: 0,
                }),
                running_singles: Mutex::new(HashSet::new()),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn log(&self, message: LogMessage) {
        self.shared.log_sink.log(message);
    }

    pub fn state(&self) -> SessionState {
        self.inner().state.clone()
    }

    pub fn active_handle(&self) -> Option<ExecutionHandle> {
        self.inner().active.as_ref().map(|a| a.handle.clone())
    }

    /// Number of monitored executions: 0 or 1
    pub fn active_executions(&self) -> usize {
        usize::from(self.inner().active.is_some())
    }

    /// Run one test outside of any batch
    ///
    /// Announces the run and its outcome on the log sink and appends the result
    /// to the result sink. A second run of the same name while the first is
    /// outstanding is refused.
    pub async fn run_single(&self, name: &str) -> DashboardResult<TestResult> {
        let _guard = SingleRunGuard::acquire(&self.shared, name)?;

        self.log(LogMessage::info(format!("Running single test: {name}")));
        match self.shared.dispatcher.run_single(name).await {
            Ok(result) => {
                self.log(LogMessage::new(result.status.log_level(), result.headline()));
                self.shared.result_sink.on_result(&result);
                Ok(result)
            }
            Err(e) => {
                self.log(LogMessage::error(format!("Failed to run {name}: {e}")));
                Err(e)
            }
        }
    }

    /// Dispatch a batch and start monitoring it
    ///
    /// Fails with a validation error, without any request, when a batch is
    /// already in flight or the test list is empty.
    pub async fn start(&self, config: ExecutionConfig) -> DashboardResult<ExecutionHandle> {
        let generation = {
            let mut inner = self.inner();
            if inner.state.is_busy() {
                return Err(DashboardError::validation(
                    "an execution is already in progress",
                ));
            }
            config.validate()?;
            inner.state = SessionState::Dispatching;
            inner.generation += 1;
            inner.generation
        };

        self.shared.result_sink.clear();
        self.announce(&config);

        let handle = match self.shared.dispatcher.execute_batch(config).await {
            Ok(handle) => handle,
            Err(e) => {
                {
                    let mut inner = self.inner();
                    if inner.generation == generation {
                        inner.state = SessionState::Idle;
                    }
                }
                self.log(LogMessage::error(format!(
                    "Failed to start batch execution: {e}"
                )));
                return Err(e);
            }
        };

        let mut inner = self.inner();
        if inner.generation != generation || inner.state != SessionState::Dispatching {
            warn!("Session torn down while dispatching {}", handle);
            return Err(DashboardError::validation(format!(
                "session was torn down before execution {handle} could be monitored"
            )));
        }

        let api = self.shared.dispatcher.api();
        let mut stream = LogStreamConsumer::new();
        stream.open(api.clone(), handle.clone(), self.shared.log_sink.clone());
        let mut poller = StatusPoller::new();
        poller.start(
            api,
            handle.clone(),
            self.shared.poll_interval,
            self.shared.log_sink.clone(),
            self.shared.result_sink.clone(),
            self.observer(),
        );

        info!("Monitoring execution {}", handle);
        inner.state = SessionState::Monitoring(handle.clone());
        inner.active = Some(ActiveExecution {
            handle: handle.clone(),
            stream,
            poller,
        });
        Ok(handle)
    }

    fn announce(&self, config: &ExecutionConfig) {
        self.log(LogMessage::info("Starting batch execution"));
        self.log(LogMessage::info("Execution order:"));
        for (idx, test) in config.tests.iter().enumerate() {
            self.log(LogMessage::info(format!("  {}. {}", idx + 1, test)));
        }
        self.log(LogMessage::info(format!(
            "Settings: concurrency={}, delay={}ms",
            config.concurrency, config.delay
        )));
    }

    fn observer(&self) -> PollObserver {
        let weak: Weak<SessionShared> = Arc::downgrade(&self.shared);
        Arc::new(move |outcome| {
            if let Some(shared) = weak.upgrade() {
                ExecutionSession { shared }.on_poll_outcome(outcome);
            }
        })
    }

    fn on_poll_outcome(&self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Completed(handle) => {
                self.on_completed(&handle);
            }
            PollOutcome::Failed(handle, _) => {
                self.on_abandoned(&handle);
            }
        }
    }

    /// Release the stream and the handle of a completed execution
    ///
    /// Returns false, doing nothing, unless `handle` is the execution being
    /// monitored; a repeated completion signal is therefore a no-op.
    pub fn on_completed(&self, handle: &ExecutionHandle) -> bool {
        self.finish(handle, SessionState::Completed(handle.clone()))
    }

    /// Release the stream and the handle of an execution whose polling failed
    pub fn on_abandoned(&self, handle: &ExecutionHandle) -> bool {
        let released = self.finish(handle, SessionState::Abandoned(handle.clone()));
        if released {
            self.log(LogMessage::new(
                LogLevel::Warning,
                format!("Stopped monitoring execution {handle}; its log stream was closed"),
            ));
        }
        released
    }

    fn finish(&self, handle: &ExecutionHandle, next: SessionState) -> bool {
        let active = {
            let mut inner = self.inner();
            if inner.state != SessionState::Monitoring(handle.clone()) {
                return false;
            }
            info!("Execution {} -> {}", handle, next);
            inner.state = next;
            inner.active.take()
        };

        if let Some(active) = active {
            active.release();
        }
        true
    }

    /// Release everything the session holds, whatever state it is in
    ///
    /// Used when the view goes away. Returns whether an execution was being
    /// monitored.
    pub fn teardown(&self) -> bool {
        let active = {
            let mut inner = self.inner();
            inner.state = SessionState::Idle;
            inner.generation += 1;
            inner.active.take()
        };

        match active {
            Some(active) => {
                info!("Tearing down monitoring of {}", active.handle);
                active.release();
                true
            }
            None => false,
        }
    }
}

/// Marks a single run as outstanding for as long as it lives
struct SingleRunGuard<'a> {
    shared: &'a SessionShared,
    name: String,
}

impl<'a> SingleRunGuard<'a> {
    fn acquire(shared: &'a SessionShared, name: &str) -> DashboardResult<Self> {
        let mut running = shared
            .running_singles
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !running.insert(name.to_string()) {
            return Err(DashboardError::validation(format!(
                "{name} is already running"
            )));
        }
        Ok(Self {
            shared,
            name: name.to_string(),
        })
    }
}

impl Drop for SingleRunGuard<'_> {
    fn drop(&mut self) {
        self.shared
            .running_singles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.name);
    }
}
