//! Result aggregation and display sinks

mod aggregator;
mod sink;

pub use aggregator::{aggregate, ExecutionSummary, ResultSummary};
pub use sink::{LogSink, MemorySink, ResultSink};
