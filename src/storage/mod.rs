//! Storage module for persisting scrape data
//!
//! This module handles all database operations for the tracker, including:
//! - SQLite database initialization and schema management
//! - Fiction metadata and append-only detail history
//! - Append-only Rising Stars rank snapshots
//! - Scrape attempt outcomes used for freshness decisions
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::StorageConfig;
use crate::extract::{FictionId, FictionStats};
use crate::state::WorkState;
use crate::StarwatchError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

/// Opens (creating if needed) the database named by the `[storage]` section
pub fn open_storage(config: &StorageConfig) -> Result<SqliteStorage, StarwatchError> {
    tracing::debug!(path = %config.database_path, "Opening database");
    SqliteStorage::new(Path::new(&config.database_path))
}

/// Formats a timestamp the way every table stores it
///
/// Fixed millisecond precision with a `Z` suffix keeps lexicographic order
/// identical to chronological order.
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored timestamp
pub fn parse_db_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// One ranked entry of a genre listing at one capture time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub fiction_id: FictionId,
    pub genre: String,
    /// 1-based, unique per (genre, captured_at)
    pub position: u32,
    pub captured_at: DateTime<Utc>,
}

impl SnapshotEntry {
    /// Calendar day (UTC) the entry was captured on
    pub fn day(&self) -> String {
        self.captured_at.format("%Y-%m-%d").to_string()
    }
}

/// Minimal data needed to start tracking a fiction
#[derive(Debug, Clone, Default)]
pub struct NewFiction {
    pub id: FictionId,
    pub title: String,
    pub author_name: String,
}

/// A tracked fiction as stored in the `fictions` table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFiction {
    pub id: FictionId,
    pub title: String,
    pub author_name: String,
    pub author_id: u64,
    pub status: String,
    pub fiction_type: String,
    pub tags: Vec<String>,
    pub warnings: Vec<String>,
    pub first_seen_at: String,
    pub last_scraped_at: Option<String>,
}

/// One row of fiction detail history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub fiction_id: FictionId,
    pub captured_at: DateTime<Utc>,
    pub stats: FictionStats,
}

/// What a scrape attempt targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptTarget {
    Fiction,
    Genre,
}

impl AttemptTarget {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Fiction => "fiction",
            Self::Genre => "genre",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fiction" => Some(Self::Fiction),
            "genre" => Some(Self::Genre),
            _ => None,
        }
    }
}

/// Outcome of one fetch of a fiction page or genre listing
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub target: AttemptTarget,
    /// Fiction id or genre slug
    pub key: String,
    pub state: WorkState,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Cutoffs deciding which fictions are due for a detail refresh
///
/// A fiction is due when it has no history row newer than `fresh_after`, and
/// its latest attempt (if newer than that history) is old enough for its
/// outcome: `retry_after` for retryable failures, `fresh_after` for terminal
/// failures and gone fictions.
#[derive(Debug, Clone, Copy)]
pub struct DuePolicy {
    pub fresh_after: DateTime<Utc>,
    pub retry_after: DateTime<Utc>,
}

impl DuePolicy {
    /// Policy evaluated at `now` with the given windows
    pub fn at(now: DateTime<Utc>, fresh: chrono::Duration, retry: chrono::Duration) -> Self {
        Self {
            fresh_after: now - fresh,
            retry_after: now - retry,
        }
    }

    /// Decides whether a latest attempt outcome still blocks the fiction
    pub fn attempt_blocks(&self, state: WorkState, attempted_at: &DateTime<Utc>) -> bool {
        match state {
            WorkState::FailedRetryable => *attempted_at >= self.retry_after,
            WorkState::FailedTerminal | WorkState::Gone => *attempted_at >= self.fresh_after,
            WorkState::Succeeded => false,
        }
    }
}

/// Kind of batch a run performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Fiction,
    Fictions,
    RisingStars,
}

impl RunMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Fiction => "fiction",
            Self::Fictions => "fictions",
            Self::RisingStars => "rising-stars",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fiction" => Some(Self::Fiction),
            "fictions" => Some(Self::Fictions),
            "rising-stars" => Some(Self::RisingStars),
            _ => None,
        }
    }
}

/// Represents a batch run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub mode: RunMode,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub processed_count: usize,
    pub saved_count: usize,
    pub total_count: usize,
}

/// Status of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Stopped by the budget with work remaining
    Partial,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
