/// Work item outcome definitions
///
/// Each fiction or genre listing attempted by a run ends in one of these
/// states, and the latest one is persisted with the attempt. Whether an item
/// is due is recomputed from timestamps at the start of every run.
use std::fmt;

/// Outcome of one attempt at a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkState {
    // ===== Success States =====
    /// Fetched, extracted and queued for writing
    Succeeded,

    /// Upstream answered 404; counted as processed, nothing written
    Gone,

    // ===== Error States =====
    /// Network failure, 429 or 5xx; eligible again after the retry window
    FailedRetryable,

    /// Any other 4xx; eligible again after the full freshness window
    FailedTerminal,
}

impl WorkState {
    /// Returns true if this represents a failed attempt
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedRetryable | Self::FailedTerminal)
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Gone => "gone",
            Self::FailedRetryable => "failed_retryable",
            Self::FailedTerminal => "failed_terminal",
        }
    }

    /// Parses a state from its database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "gone" => Some(Self::Gone),
            "failed_retryable" => Some(Self::FailedRetryable),
            "failed_terminal" => Some(Self::FailedTerminal),
            _ => None,
        }
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
