//! Output formatting module
//!
//! Renders log entries, results and execution summaries for the terminal.

mod console;
mod formatter;

pub use console::ConsoleSink;
pub use formatter::{OutputFormat, ResultFormatter};
