//! Result aggregation
//!
//! Summaries are recomputed from a full results snapshot every time; nothing is
//! carried over between calls, so overlapping or repeated polls cannot skew them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Execution, ExecutionStatus, ResultStatus, TestResult};

/// Statistics derived from one results snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub success_count: usize,
    /// Failures and errors together
    pub failure_count: usize,
    pub error_count: usize,
    pub max_duration_ms: u64,
    pub total_duration_ms: u64,
    pub sample_count: usize,
}

impl ResultSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let success_count = results
            .iter()
            .filter(|r| r.status == ResultStatus::Success)
            .count();
        let error_count = results
            .iter()
            .filter(|r| r.status == ResultStatus::Error)
            .count();

        Self {
            success_count,
            failure_count: results.len() - success_count,
            error_count,
            max_duration_ms: results.iter().map(|r| r.duration_ms).max().unwrap_or(0),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            sample_count: results.len(),
        }
    }

    pub fn avg_duration_ms(&self) -> u64 {
        if self.sample_count == 0 {
            0
        } else {
            self.total_duration_ms / self.sample_count as u64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            (self.success_count as f64 / self.sample_count as f64) * 100.0
        }
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success: {} | Failure: {} | Error: {} | Max: {}ms | Samples: {}",
            self.success_count,
            self.failure_count - self.error_count,
            self.error_count,
            self.max_duration_ms,
            self.sample_count
        )
    }
}

/// What gets displayed for one polled snapshot
///
/// The counters are the server's own; `stats` is derived locally from the
/// results carried by the same snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub id: String,
    pub status: ExecutionStatus,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_tests: usize,
    pub stats: ResultSummary,
}

impl ExecutionSummary {
    pub fn completed_tests(&self) -> usize {
        self.stats.sample_count
    }

    pub fn progress(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            (self.completed_tests() as f64 / self.total_tests as f64) * 100.0
        }
    }
}

impl fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Execution {} [{}] - Success: {} | Failure: {} | Total: {}",
            self.id, self.status, self.success_count, self.failure_count, self.total_tests
        )
    }
}

/// Summarize a polled execution snapshot
pub fn aggregate(execution: &Execution) -> ExecutionSummary {
    ExecutionSummary {
        id: execution.id.clone(),
        status: execution.status,
        success_count: execution.success_count,
        failure_count: execution.failure_count,
        total_tests: execution.total_tests,
        stats: ResultSummary::from_results(&execution.results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TestResult> {
        vec![
            TestResult::success("a", 120),
            TestResult::failure("b", 300),
            TestResult::error("c", "timeout"),
            TestResult::success("d", 80),
        ]
    }

    #[test]
    fn test_empty_snapshot_defaults() {
        let summary = ResultSummary::from_results(&[]);
        assert_eq!(summary, ResultSummary::default());
        assert_eq!(summary.avg_duration_ms(), 0);
        assert_eq!(summary.success_rate(), 0.0);
    }

    #[test]
    fn test_counts_and_stats() {
        let summary = ResultSummary::from_results(&sample());
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failure_count, 2);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.max_duration_ms, 300);
        assert_eq!(summary.sample_count, 4);
        assert_eq!(summary.avg_duration_ms(), 125);
        assert_eq!(summary.success_rate(), 50.0);
    }

    #[test]
    fn test_idempotent() {
        let results = sample();
        assert_eq!(
            ResultSummary::from_results(&results),
            ResultSummary::from_results(&results)
        );

        let execution = Execution::new("e1", ExecutionStatus::Running, 5).with_results(results);
        assert_eq!(aggregate(&execution), aggregate(&execution));
    }

    #[test]
    fn test_aggregate_keeps_server_counts() {
        let mut execution =
            Execution::new("e1", ExecutionStatus::Running, 4).with_results(sample());
        execution.success_count = 3;
        let summary = aggregate(&execution);
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.stats.success_count, 2);
        assert_eq!(summary.progress(), 100.0);
    }

    #[test]
    fn test_display() {
        let summary = ResultSummary::from_results(&sample());
        assert_eq!(
            summary.to_string(),
            "Success: 2 | Failure: 1 | Error: 1 | Max: 300ms | Samples: 4"
        );
    }
}
