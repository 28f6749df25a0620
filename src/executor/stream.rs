//! Log stream consumer
//!
//! Subscribes to the pushed log channel of one execution and forwards every
//! event to the log sink. Events are forwarded for as long as the consumer is
//! open, which includes events the server flushes after the status poll has
//! already observed completion: the two channels are not ordered against each
//! other, so trailing log lines may land after the final snapshot.
//!
//! A transport failure is logged once and ends the consumer; it never
//! reconnects.

use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::http::DashboardApi;
use crate::models::{ExecutionHandle, LogMessage};
use crate::results::LogSink;

pub struct LogStreamConsumer {
    open: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl LogStreamConsumer {
    /// A consumer in the closed state
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Subscribe to the log channel of `handle`, closing any previous subscription
    pub fn open(
        &mut self,
        api: Arc<dyn DashboardApi>,
        handle: ExecutionHandle,
        sink: Arc<dyn LogSink>,
    ) {
        self.close();

        let open = Arc::new(AtomicBool::new(true));
        self.open = open.clone();
        self.task = Some(tokio::spawn(async move {
            consume(api, handle, sink).await;
            open.store(false, Ordering::SeqCst);
        }));
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Stop listening; returns false when already closed
    pub fn close(&mut self) -> bool {
        let was_open = self.open.swap(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        was_open
    }
}

impl Default for LogStreamConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LogStreamConsumer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn consume(api: Arc<dyn DashboardApi>, handle: ExecutionHandle, sink: Arc<dyn LogSink>) {
    let mut events = match api.open_log_stream(&handle).await {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to open log stream for {}: {}", handle, e);
            sink.log(LogMessage::error(format!("Log stream unavailable: {e}")));
            return;
        }
    };
    debug!("Log stream for {} open", handle);

    while let Some(event) = events.next().await {
        match event {
            Ok(payload) => match LogMessage::parse(&payload) {
                Ok(message) => sink.log(message),
                Err(e) => {
                    warn!("Dropping log event for {}: {}", handle, e);
                    sink.log(LogMessage::error(format!("Discarded log event: {e}")));
                }
            },
            Err(e) => {
                error!("Log stream for {} failed: {}", handle, e);
                sink.log(LogMessage::error(e.to_string()));
                return;
            }
        }
    }

    debug!("Log stream for {} ended by server", handle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::executor::testing::{settle, ScriptedApi};
    use crate::models::LogLevel;
    use crate::results::MemorySink;

    fn open(api: &Arc<ScriptedApi>, sink: &Arc<MemorySink>) -> LogStreamConsumer {
        let mut consumer = LogStreamConsumer::new();
        consumer.open(api.clone(), ExecutionHandle::new("exec-1"), sink.clone());
        consumer
    }

    #[tokio::test]
    async fn test_forwards_events_in_order() {
        let api = ScriptedApi::new();
        let sink = Arc::new(MemorySink::new());
        let consumer = open(&api, &sink);
        settle().await;
        assert!(consumer.is_open());

        api.push_log(r#"{"level":"info","message":"starting"}"#);
        api.push_log(r#"{"level":"success","message":"a ok"}"#);
        settle().await;

        assert_eq!(
            sink.logs(),
            vec![
                LogMessage::new(LogLevel::Info, "starting"),
                LogMessage::new(LogLevel::Success, "a ok"),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_event_does_not_stop_stream() {
        let api = ScriptedApi::new();
        let sink = Arc::new(MemorySink::new());
        let consumer = open(&api, &sink);
        settle().await;

        api.push_log(r#"{"level":"info","message":"one"}"#);
        api.push_log("{not json");
        api.push_log(r#"{"level":"failure","message":"two"}"#);
        settle().await;

        let logs = sink.logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "one");
        assert_eq!(logs[1].level, LogLevel::Error);
        assert!(logs[1].message.starts_with("Discarded log event"));
        assert_eq!(logs[2], LogMessage::new(LogLevel::Failure, "two"));
        assert!(consumer.is_open());
    }

    #[tokio::test]
    async fn test_transport_error_closes_without_reconnect() {
        let api = ScriptedApi::new();
        let sink = Arc::new(MemorySink::new());
        let consumer = open(&api, &sink);
        settle().await;

        api.send_log(Err(DashboardError::StreamTransport("connection reset".into())));
        settle().await;

        assert!(!consumer.is_open());
        let logs = sink.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert!(logs[0].message.contains("connection reset"));
        assert_eq!(api.stream_opens.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_failure_is_logged() {
        let api = ScriptedApi::new();
        api.fail_stream(DashboardError::StreamTransport("HTTP 404".into()));
        let sink = Arc::new(MemorySink::new());
        let consumer = open(&api, &sink);
        settle().await;

        assert!(!consumer.is_open());
        assert_eq!(sink.logs()[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn test_server_end_closes() {
        let api = ScriptedApi::new();
        let sink = Arc::new(MemorySink::new());
        let consumer = open(&api, &sink);
        settle().await;

        api.end_logs();
        settle().await;
        assert!(!consumer.is_open());
        assert!(sink.logs().is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let api = ScriptedApi::new();
        let sink = Arc::new(MemorySink::new());
        let mut consumer = open(&api, &sink);
        settle().await;

        assert!(consumer.close());
        assert!(!consumer.close());
        settle().await;
        assert_eq!(api.drops(), 1);

        api.push_log(r#"{"level":"info","message":"late"}"#);
        settle().await;
        assert!(sink.logs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_events_after_completion_until_closed() {
        use crate::executor::poller::{PollOutcome, StatusPoller};
        use crate::executor::testing::wait_until;
        use crate::models::ExecutionStatus;
        use std::sync::Mutex;
        use std::time::Duration;

        let api = ScriptedApi::new();
        api.queue_statuses(&[ExecutionStatus::Completed]);
        let sink = Arc::new(MemorySink::new());
        let mut consumer = open(&api, &sink);

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let mut poller = StatusPoller::new();
        poller.start(
            api.clone(),
            ExecutionHandle::new("exec-1"),
            Duration::from_millis(1000),
            sink.clone(),
            sink.clone(),
            Arc::new({
                let outcomes = outcomes.clone();
                move |outcome: PollOutcome| outcomes.lock().unwrap().push(outcome)
            }),
        );
        assert!(wait_until(|| !outcomes.lock().unwrap().is_empty(), 100).await);
        assert!(consumer.is_open());

        api.push_log(r#"{"level":"success","message":"trailing line"}"#);
        settle().await;
        assert!(sink
            .logs()
            .contains(&LogMessage::new(LogLevel::Success, "trailing line")));

        assert!(consumer.close());
        api.push_log(r#"{"level":"info","message":"after close"}"#);
        settle().await;
        assert!(!sink.logs().iter().any(|l| l.message == "after close"));
    }

    #[test]
    fn test_new_is_closed() {
        let mut consumer = LogStreamConsumer::new();
        assert!(!consumer.is_open());
        assert!(!consumer.close());
    }
}
