//! runboard - client-side orchestration for a test dashboard server
//!
//! Lets an operator pick tests, order them, dispatch them one at a time or
//! as a batch, and follow a batch through the server's push log stream and
//! a periodic status poll until it completes.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use runboard::executor::ExecutionSession;
//! use runboard::http::HttpClient;
//! use runboard::results::MemorySink;
//! use runboard::selection::OrderedSelection;
//!
//! # async fn demo() -> runboard::error::DashboardResult<()> {
//! let api = Arc::new(HttpClient::new("http://localhost:7777/api")?);
//! let sink = Arc::new(MemorySink::new());
//! let session = ExecutionSession::new(api, sink.clone(), sink.clone());
//!
//! let mut selection = OrderedSelection::new(["login", "checkout", "search"]);
//! selection.select_all();
//! let handle = session.start(selection.to_config(2, 0)).await?;
//! println!("monitoring {handle}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod models;
pub mod output;
pub mod results;
pub mod selection;
pub mod utils;

pub use error::{DashboardError, DashboardResult};
pub use executor::{ExecutionSession, SessionState};
pub use selection::OrderedSelection;
