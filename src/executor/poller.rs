//! Execution status poller
//!
//! Pulls the snapshot of one execution at a fixed cadence. Each tick's request
//! runs as its own task, so a slow response can still be outstanding when the
//! next tick fires. That overlap is harmless: every snapshot is aggregated
//! from scratch, and the first tick to observe a terminal state (or a failure)
//! flips the stop flag, which silences every other tick still in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::DashboardError;
use crate::http::DashboardApi;
use crate::models::{ExecutionHandle, LogMessage};
use crate::results::{aggregate, LogSink, ResultSink};

/// Poll cadence used by the dashboard
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Terminal outcome reported to the poller's owner, at most once per start
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    Completed(ExecutionHandle),
    Failed(ExecutionHandle, DashboardError),
}

impl PollOutcome {
    pub fn handle(&self) -> &ExecutionHandle {
        match self {
            PollOutcome::Completed(handle) | PollOutcome::Failed(handle, _) => handle,
        }
    }
}

/// Callback through which the poller signals its owner
pub type PollObserver = Arc<dyn Fn(PollOutcome) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Stopped,
}

/// Everything one tick needs
struct TickContext {
    api: Arc<dyn DashboardApi>,
    handle: ExecutionHandle,
    stopped: Arc<AtomicBool>,
    log_sink: Arc<dyn LogSink>,
    result_sink: Arc<dyn ResultSink>,
    observer: PollObserver,
}

pub struct StatusPoller {
    stopped: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new() -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn state(&self) -> PollerState {
        match (&self.task, self.stopped.load(Ordering::SeqCst)) {
            (None, _) => PollerState::Idle,
            (Some(_), true) => PollerState::Stopped,
            (Some(_), false) => PollerState::Polling,
        }
    }

    /// Begin polling `handle` every `interval`; the first request goes out
    /// one interval after the call
    pub fn start(
        &mut self,
        api: Arc<dyn DashboardApi>,
        handle: ExecutionHandle,
        interval: Duration,
        log_sink: Arc<dyn LogSink>,
        result_sink: Arc<dyn ResultSink>,
        observer: PollObserver,
    ) {
        self.stop();

        let stopped = Arc::new(AtomicBool::new(false));
        self.stopped = stopped.clone();

        let ctx = Arc::new(TickContext {
            api,
            handle,
            stopped,
            log_sink,
            result_sink,
            observer,
        });

        debug!(
            "Polling execution {} every {}ms",
            ctx.handle,
            interval.as_millis()
        );
        self.task = Some(tokio::spawn(poll_loop(ctx, interval)));
    }

    /// Stop ticking and drop any request still in flight; returns false when
    /// the poller was not polling
    pub fn stop(&mut self) -> bool {
        let was_polling = !self.stopped.swap(true, Ordering::SeqCst) && self.task.is_some();
        if let Some(task) = &self.task {
            task.abort();
        }
        was_polling
    }
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(ctx: Arc<TickContext>, interval: Duration) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        ticker.tick().await;
        if ctx.stopped.load(Ordering::SeqCst) {
            break;
        }
        in_flight.spawn(tick(ctx.clone()));
        while in_flight.try_join_next().is_some() {}
    }
}

async fn tick(ctx: Arc<TickContext>) {
    match ctx.api.fetch_execution(&ctx.handle).await {
        Ok(execution) => {
            if ctx.stopped.load(Ordering::SeqCst) {
                debug!("Ignoring late snapshot for {}", ctx.handle);
                return;
            }

            let summary = aggregate(&execution);
            ctx.result_sink.on_snapshot(&summary, &execution.results);

            if execution.status.is_terminal() && !ctx.stopped.swap(true, Ordering::SeqCst) {
                info!(
                    "Execution {} completed: {} passed, {} failed of {}",
                    ctx.handle, summary.success_count, summary.failure_count, summary.total_tests
                );
                (ctx.observer)(PollOutcome::Completed(ctx.handle.clone()));
            }
        }
        Err(e) => {
            if ctx.stopped.swap(true, Ordering::SeqCst) {
                return;
            }
            warn!("Polling of {} stopped: {}", ctx.handle, e);
            ctx.log_sink.log(LogMessage::error(format!(
                "Status poll for execution {} failed: {e}",
                ctx.handle
            )));
            (ctx.observer)(PollOutcome::Failed(ctx.handle.clone(), e));
        }
    }
}
