//! Execution budget of one invocation

use std::time::Duration;
use tokio::time::Instant;

/// Soft wall-clock ceiling for one orchestrator run
///
/// Derived once at run start from the host's remaining-time signal minus a
/// safety buffer, then only read. Nothing is ever aborted when the budget runs
/// out; callers check it before starting new work.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingBudget {
    started_at: Instant,
    max_execution_time: Duration,
    buffer_time: Duration,
}

impl ProcessingBudget {
    /// Budget starting now, allowing `max_execution_time` of work
    pub fn new(max_execution_time: Duration, buffer_time: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            max_execution_time,
            buffer_time,
        }
    }

    /// Budget derived from the host's remaining time minus the safety buffer
    ///
    /// # Example
    ///
    /// ```
    /// use starwatch::ProcessingBudget;
    /// use std::time::Duration;
    ///
    /// let budget = ProcessingBudget::from_remaining(
    ///     Duration::from_secs(60),
    ///     Duration::from_secs(10),
    /// );
    /// assert_eq!(budget.max_execution_time(), Duration::from_secs(50));
    /// ```
    pub fn from_remaining(remaining: Duration, buffer_time: Duration) -> Self {
        Self::new(remaining.saturating_sub(buffer_time), buffer_time)
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn max_execution_time(&self) -> Duration {
        self.max_execution_time
    }

    pub fn buffer_time(&self) -> Duration {
        self.buffer_time
    }

    /// Time spent since the run started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.max_execution_time.saturating_sub(self.elapsed())
    }

    /// True once `elapsed >= max_execution_time`
    pub fn is_exhausted(&self) -> bool {
        self.elapsed() >= self.max_execution_time
    }
}
