//! Execution orchestration
//!
//! Dispatches runs and monitors the current batch through its log stream and
//! status poll.

mod dispatcher;
mod poller;
mod session;
mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::Dispatcher;
pub use poller::{PollObserver, PollOutcome, PollerState, StatusPoller, DEFAULT_POLL_INTERVAL};
pub use session::{ExecutionSession, SessionState};
pub use stream::LogStreamConsumer;
