//! Outcome of one batch run

use crate::storage::RunStatus;
use serde::Serialize;
use std::time::Duration;

/// Counts reported at the end of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Items attempted, whatever their outcome
    pub processed_count: usize,
    /// Rows written (history rows or snapshot entries)
    pub saved_count: usize,
    /// Attempted items that failed
    pub failed_count: usize,
    /// Items on the work list when the run started
    pub total_count: usize,
    /// `total_count - processed_count`
    pub remaining_count: usize,
    pub execution_time_ms: u64,
}

impl RunSummary {
    pub fn new(
        processed_count: usize,
        saved_count: usize,
        failed_count: usize,
        total_count: usize,
        execution_time: Duration,
    ) -> Self {
        Self {
            processed_count,
            saved_count,
            failed_count,
            total_count,
            remaining_count: total_count.saturating_sub(processed_count),
            execution_time_ms: execution_time.as_millis() as u64,
        }
    }

    /// True when the budget stopped the run with work left over
    pub fn is_partial(&self) -> bool {
        self.remaining_count > 0
    }

    /// Status recorded on the run row
    pub fn run_status(&self) -> RunStatus {
        if self.is_partial() {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_count() {
        let summary = RunSummary::new(3, 2, 1, 10, Duration::from_millis(1500));
        assert_eq!(summary.remaining_count, 7);
        assert_eq!(summary.execution_time_ms, 1500);
        assert!(summary.is_partial());
        assert_eq!(summary.run_status(), RunStatus::Partial);
    }

    #[test]
    fn test_nothing_to_do_is_complete() {
        let summary = RunSummary::new(0, 0, 0, 0, Duration::ZERO);
        assert!(!summary.is_partial());
        assert_eq!(summary.run_status(), RunStatus::Completed);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(RunSummary::new(1, 1, 0, 2, Duration::ZERO)).unwrap();
        assert_eq!(json["processedCount"], 1);
        assert_eq!(json["remainingCount"], 1);
        assert_eq!(json["executionTimeMs"], 0);
    }
}
