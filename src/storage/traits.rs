//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::extract::{FictionId, FictionRecord};
use crate::state::WorkState;
use crate::storage::{
    AttemptRecord, DuePolicy, HistoryEntry, NewFiction, RunMode, RunRecord, RunStatus,
    SnapshotEntry, TrackedFiction,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Fiction not found: {0}")]
    FictionNotFound(FictionId),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes are append-or-upsert keyed by natural identity: fiction id for
/// fiction metadata, (fiction id, captured_at) for history and
/// (fiction id, genre, captured_at) for rank snapshots. Re-applying the same
/// batch is therefore harmless.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new batch run
    ///
    /// # Arguments
    ///
    /// * `mode` - Kind of batch being run
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, mode: RunMode, config_hash: &str) -> StorageResult<i64>;

    /// Finishes a run with its final status and counts
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        processed_count: usize,
        saved_count: usize,
        total_count: usize,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Fiction Management =====

    /// Gets a tracked fiction by its site id
    fn get_fiction_by_key(&self, id: FictionId) -> StorageResult<Option<TrackedFiction>>;

    /// Starts tracking a fiction; does nothing if it is already tracked
    fn create_fiction(&mut self, fiction: &NewFiction, seen_at: DateTime<Utc>)
        -> StorageResult<()>;

    /// Inserts or replaces fiction metadata from a full extraction
    fn upsert_fiction(&mut self, record: &FictionRecord, scraped_at: DateTime<Utc>)
        -> StorageResult<()>;

    // ===== Append-only Data =====

    /// Appends detail history rows in one transaction
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn append_fiction_history(&mut self, entries: &[HistoryEntry]) -> StorageResult<usize>;

    /// Appends rank snapshot entries in one transaction
    ///
    /// Entries whose (fiction, genre, captured_at) already exist are skipped.
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn append_snapshot_entries(&mut self, entries: &[SnapshotEntry]) -> StorageResult<usize>;

    /// Records the outcome of one fetch
    fn record_attempt(&mut self, attempt: &AttemptRecord) -> StorageResult<()>;

    // ===== Work Lists =====

    /// Lists fictions due for a detail refresh, least recently refreshed first
    ///
    /// # Arguments
    ///
    /// * `policy` - Freshness and retry cutoffs
    /// * `limit` - Maximum number of ids to return
    fn get_entities_due_for_update(
        &self,
        policy: &DuePolicy,
        limit: usize,
    ) -> StorageResult<Vec<FictionId>>;

    /// Filters `genres` down to those without a snapshot since `fresh_after`
    ///
    /// Order of `genres` is preserved.
    fn get_genres_due_for_update(
        &self,
        genres: &[String],
        fresh_after: DateTime<Utc>,
    ) -> StorageResult<Vec<String>>;

    // ===== Snapshot Queries =====

    /// Most recent distinct capture days (`YYYY-MM-DD`) of a genre, newest first
    fn snapshot_days(&self, genre: &str, limit: usize) -> StorageResult<Vec<String>>;

    /// All snapshot entries of a genre captured on one day
    fn snapshot_entries_for_day(&self, genre: &str, day: &str)
        -> StorageResult<Vec<SnapshotEntry>>;

    /// Entries of the most recent capture of a genre
    fn latest_snapshot(&self, genre: &str) -> StorageResult<Vec<SnapshotEntry>>;

    // ===== Statistics =====

    /// Counts tracked fictions
    fn count_fictions(&self) -> StorageResult<usize>;

    /// Counts fiction history rows
    fn count_history_entries(&self) -> StorageResult<usize>;

    /// Counts rank snapshot rows
    fn count_snapshot_entries(&self) -> StorageResult<usize>;

    /// Counts recorded attempts grouped by outcome
    fn count_attempts_by_state(&self) -> StorageResult<HashMap<WorkState, usize>>;
}
