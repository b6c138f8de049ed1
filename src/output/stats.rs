//! Statistics generation from the tracker database
//!
//! This module provides functionality for extracting and displaying
//! tracker statistics from the storage layer.

use crate::state::WorkState;
use crate::storage::{RunRecord, Storage};
use crate::StarwatchError;
use std::collections::HashMap;
use std::fmt::Write;

/// Tracker statistics summary
#[derive(Debug, Clone)]
pub struct TrackerStatistics {
    /// Number of fictions being tracked
    pub tracked_fictions: usize,

    /// Number of fiction history rows
    pub history_entries: usize,

    /// Number of rank snapshot rows
    pub snapshot_entries: usize,

    /// Recorded fetch outcomes by state
    pub attempts_by_state: HashMap<WorkState, usize>,

    /// Most recent batch run, if any
    pub latest_run: Option<RunRecord>,
}

impl TrackerStatistics {
    /// Failed attempts only, retryable and terminal
    pub fn failed_attempts(&self) -> usize {
        self.attempts_by_state
            .iter()
            .filter(|(state, _)| state.is_failure())
            .map(|(_, count)| count)
            .sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(TrackerStatistics)` - Successfully loaded statistics
/// * `Err(StarwatchError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<TrackerStatistics, StarwatchError> {
    Ok(TrackerStatistics {
        tracked_fictions: storage.count_fictions()?,
        history_entries: storage.count_history_entries()?,
        snapshot_entries: storage.count_snapshot_entries()?,
        attempts_by_state: storage.count_attempts_by_state()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Renders statistics as the text printed by `stats`
pub fn format_statistics(stats: &TrackerStatistics) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Tracker Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Tracked fictions: {}", stats.tracked_fictions);
    let _ = writeln!(out, "  History rows: {}", stats.history_entries);
    let _ = writeln!(out, "  Snapshot rows: {}", stats.snapshot_entries);
    let _ = writeln!(out);

    if !stats.attempts_by_state.is_empty() {
        let _ = writeln!(out, "Attempts by Outcome:");
        let mut state_counts: Vec<_> = stats.attempts_by_state.iter().collect();
        state_counts.sort_by(|a, b| {
            b.1.cmp(a.1)
                .then_with(|| a.0.to_db_string().cmp(b.0.to_db_string()))
        });

        for (state, count) in state_counts {
            let _ = writeln!(out, "  {}: {}", state, count);
        }
        let _ = writeln!(out, "  Failed total: {}", stats.failed_attempts());
        let _ = writeln!(out);
    }

    match &stats.latest_run {
        Some(run) => {
            let _ = writeln!(out, "Latest Run (#{}):", run.id);
            let _ = writeln!(out, "  Mode: {}", run.mode.to_db_string());
            let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
            let _ = writeln!(out, "  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                let _ = writeln!(out, "  Finished: {}", finished);
            }
            let _ = writeln!(
                out,
                "  Processed: {} / {} ({} saved)",
                run.processed_count, run.total_count, run.saved_count
            );
        }
        None => {
            let _ = writeln!(out, "No runs recorded yet");
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &TrackerStatistics) {
    print!("{}", format_statistics(stats));
}
