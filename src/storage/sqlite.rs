//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::extract::{FictionId, FictionRecord};
use crate::state::WorkState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    db_timestamp, parse_db_timestamp, AttemptRecord, AttemptTarget, DuePolicy, HistoryEntry,
    NewFiction, RunMode, RunRecord, RunStatus, SnapshotEntry, TrackedFiction,
};
use crate::StarwatchError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StarwatchError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, StarwatchError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, StarwatchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_snapshot(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<SnapshotEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(params, snapshot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

/// Reads an RFC 3339 timestamp column
fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_db_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn snapshot_from_row(row: &Row) -> rusqlite::Result<SnapshotEntry> {
    Ok(SnapshotEntry {
        fiction_id: row.get::<_, i64>(0)? as FictionId,
        genre: row.get(1)?,
        position: row.get(2)?,
        captured_at: timestamp_column(row, 3)?,
    })
}

fn run_from_row(row: &Row) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        mode: RunMode::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunMode::Fictions),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        processed_count: row.get::<_, i64>(6)? as usize,
        saved_count: row.get::<_, i64>(7)? as usize,
        total_count: row.get::<_, i64>(8)? as usize,
    })
}

const RUN_COLUMNS: &str = "id, mode, started_at, finished_at, config_hash, status,
     processed_count, saved_count, total_count";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, mode: RunMode, config_hash: &str) -> StorageResult<i64> {
        let now = db_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO runs (mode, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                mode.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        processed_count: usize,
        saved_count: usize,
        total_count: usize,
    ) -> StorageResult<()> {
        let now = db_timestamp(Utc::now());
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, processed_count = ?3,
             saved_count = ?4, total_count = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                processed_count as i64,
                saved_count as i64,
                total_count as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        Ok(self.conn.query_row(&sql, [], run_from_row).optional()?)
    }

    // ===== Fiction Management =====

    fn get_fiction_by_key(&self, id: FictionId) -> StorageResult<Option<TrackedFiction>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, author_name, author_id, status, fiction_type, tags, warnings,
                 first_seen_at, last_scraped_at
                 FROM fictions WHERE id = ?1",
                params![id as i64],
                |row| {
                    Ok((
                        TrackedFiction {
                            id: row.get::<_, i64>(0)? as FictionId,
                            title: row.get(1)?,
                            author_name: row.get(2)?,
                            author_id: row.get::<_, i64>(3)? as u64,
                            status: row.get(4)?,
                            fiction_type: row.get(5)?,
                            tags: Vec::new(),
                            warnings: Vec::new(),
                            first_seen_at: row.get(8)?,
                            last_scraped_at: row.get(9)?,
                        },
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mut fiction, tags, warnings)) => {
                fiction.tags = serde_json::from_str(&tags)?;
                fiction.warnings = serde_json::from_str(&warnings)?;
                Ok(Some(fiction))
            }
            None => Ok(None),
        }
    }

    fn create_fiction(
        &mut self,
        fiction: &NewFiction,
        seen_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO fictions (id, title, author_name, first_seen_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                fiction.id as i64,
                fiction.title,
                fiction.author_name,
                db_timestamp(seen_at)
            ],
        )?;
        Ok(())
    }

    fn upsert_fiction(
        &mut self,
        record: &FictionRecord,
        scraped_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let tags = serde_json::to_string(&record.tags)?;
        let warnings = serde_json::to_string(&record.warnings)?;
        let scraped_at = db_timestamp(scraped_at);

        self.conn.execute(
            "INSERT INTO fictions (id, title, author_name, author_id, author_avatar, description,
             image, status, fiction_type, tags, warnings, first_seen_at, last_scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                author_name = excluded.author_name,
                author_id = excluded.author_id,
                author_avatar = excluded.author_avatar,
                description = excluded.description,
                image = excluded.image,
                status = excluded.status,
                fiction_type = excluded.fiction_type,
                tags = excluded.tags,
                warnings = excluded.warnings,
                last_scraped_at = excluded.last_scraped_at",
            params![
                record.id as i64,
                record.title,
                record.author.name,
                record.author.id as i64,
                record.author.avatar,
                record.description,
                record.image,
                record.status,
                record.fiction_type,
                tags,
                warnings,
                scraped_at
            ],
        )?;
        Ok(())
    }

    // ===== Append-only Data =====

    fn append_fiction_history(&mut self, entries: &[HistoryEntry]) -> StorageResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO fiction_history (fiction_id, captured_at, pages, ratings,
                 followers, favorites, views, total_views, average_views, overall_score,
                 style_score, story_score, grammar_score, character_score, score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for entry in entries {
                let stats = &entry.stats;
                inserted += stmt.execute(params![
                    entry.fiction_id as i64,
                    db_timestamp(entry.captured_at),
                    stats.pages as i64,
                    stats.ratings as i64,
                    stats.followers as i64,
                    stats.favorites as i64,
                    stats.views as i64,
                    stats.total_views as i64,
                    stats.average_views as i64,
                    stats.overall_score,
                    stats.style_score,
                    stats.story_score,
                    stats.grammar_score,
                    stats.character_score,
                    stats.score
                ])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn append_snapshot_entries(&mut self, entries: &[SnapshotEntry]) -> StorageResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO rank_snapshots (fiction_id, genre, position, captured_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                inserted += stmt.execute(params![
                    entry.fiction_id as i64,
                    entry.genre,
                    entry.position,
                    db_timestamp(entry.captured_at)
                ])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn record_attempt(&mut self, attempt: &AttemptRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO scrape_attempts (target, key, state, status_code, error_message, attempted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                attempt.target.to_db_string(),
                attempt.key,
                attempt.state.to_db_string(),
                attempt.status_code,
                attempt.error_message,
                db_timestamp(attempt.attempted_at)
            ],
        )?;
        Ok(())
    }

    // ===== Work Lists =====

    fn get_entities_due_for_update(
        &self,
        policy: &DuePolicy,
        limit: usize,
    ) -> StorageResult<Vec<FictionId>> {
        let fresh_after = db_timestamp(policy.fresh_after);
        let fiction_target = AttemptTarget::Fiction.to_db_string();

        let mut stmt = self.conn.prepare(
            "SELECT f.id, h.last_success, a.state, a.attempted_at
             FROM fictions f
             LEFT JOIN (
                 SELECT fiction_id, MAX(captured_at) AS last_success
                 FROM fiction_history GROUP BY fiction_id
             ) h ON h.fiction_id = f.id
             LEFT JOIN scrape_attempts a ON a.id = (
                 SELECT id FROM scrape_attempts
                 WHERE target = ?1 AND key = CAST(f.id AS TEXT)
                 ORDER BY attempted_at DESC, id DESC LIMIT 1
             )
             WHERE h.last_success IS NULL OR h.last_success < ?2
             ORDER BY h.last_success IS NOT NULL, h.last_success ASC, f.id ASC",
        )?;

        let rows = stmt
            .query_map(params![fiction_target, fresh_after], |row| {
                Ok((
                    row.get::<_, i64>(0)? as FictionId,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let due = rows
            .into_iter()
            .filter(|(_, last_success, state, attempted_at)| {
                let (Some(state), Some(attempted_at)) = (state, attempted_at) else {
                    return true;
                };
                // A success newer than the attempt supersedes it
                if matches!(last_success, Some(success) if success >= attempted_at) {
                    return true;
                }
                match (
                    WorkState::from_db_string(state),
                    parse_db_timestamp(attempted_at),
                ) {
                    (Some(state), Some(at)) => !policy.attempt_blocks(state, &at),
                    _ => true,
                }
            })
            .map(|(id, ..)| id)
            .take(limit)
            .collect();

        Ok(due)
    }

    fn get_genres_due_for_update(
        &self,
        genres: &[String],
        fresh_after: DateTime<Utc>,
    ) -> StorageResult<Vec<String>> {
        let cutoff = db_timestamp(fresh_after);
        let mut stmt = self
            .conn
            .prepare("SELECT MAX(captured_at) FROM rank_snapshots WHERE genre = ?1")?;

        let mut due = Vec::new();
        for genre in genres {
            let latest: Option<String> = stmt.query_row(params![genre], |row| row.get(0))?;
            if latest.map_or(true, |latest| latest < cutoff) {
                due.push(genre.clone());
            }
        }
        Ok(due)
    }

    // ===== Snapshot Queries =====

    fn snapshot_days(&self, genre: &str, limit: usize) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(captured_at, 1, 10) AS day FROM rank_snapshots
             WHERE genre = ?1 ORDER BY day DESC LIMIT ?2",
        )?;
        let days = stmt
            .query_map(params![genre, limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(days)
    }

    fn snapshot_entries_for_day(
        &self,
        genre: &str,
        day: &str,
    ) -> StorageResult<Vec<SnapshotEntry>> {
        self.query_snapshot(
            "SELECT fiction_id, genre, position, captured_at FROM rank_snapshots
             WHERE genre = ?1 AND substr(captured_at, 1, 10) = ?2
             ORDER BY captured_at ASC, position ASC",
            params![genre, day],
        )
    }

    fn latest_snapshot(&self, genre: &str) -> StorageResult<Vec<SnapshotEntry>> {
        self.query_snapshot(
            "SELECT fiction_id, genre, position, captured_at FROM rank_snapshots
             WHERE genre = ?1
               AND captured_at = (SELECT MAX(captured_at) FROM rank_snapshots WHERE genre = ?1)
             ORDER BY position ASC",
            params![genre],
        )
    }

    // ===== Statistics =====

    fn count_fictions(&self) -> StorageResult<usize> {
        self.count("SELECT COUNT(*) FROM fictions")
    }

    fn count_history_entries(&self) -> StorageResult<usize> {
        self.count("SELECT COUNT(*) FROM fiction_history")
    }

    fn count_snapshot_entries(&self) -> StorageResult<usize> {
        self.count("SELECT COUNT(*) FROM rank_snapshots")
    }

    fn count_attempts_by_state(&self) -> StorageResult<HashMap<WorkState, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM scrape_attempts GROUP BY state")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (state, count) in rows {
            if let Some(state) = WorkState::from_db_string(&state) {
                counts.insert(state, count as usize);
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FictionStats;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn new_fiction(id: FictionId) -> NewFiction {
        NewFiction {
            id,
            title: format!("Fiction {}", id),
            author_name: "Author".to_string(),
        }
    }

    fn history(id: FictionId, captured_at: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            fiction_id: id,
            captured_at,
            stats: FictionStats {
                followers: 10,
                ..Default::default()
            },
        }
    }

    fn attempt(id: FictionId, state: WorkState, attempted_at: DateTime<Utc>) -> AttemptRecord {
        AttemptRecord {
            target: AttemptTarget::Fiction,
            key: id.to_string(),
            state,
            status_code: None,
            error_message: None,
            attempted_at,
        }
    }

    fn entry(id: FictionId, genre: &str, position: u32, captured_at: DateTime<Utc>) -> SnapshotEntry {
        SnapshotEntry {
            fiction_id: id,
            genre: genre.to_string(),
            position,
            captured_at,
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run(RunMode::RisingStars, "test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.mode, RunMode::RisingStars);

        storage
            .finish_run(run_id, RunStatus::Partial, 3, 2, 5)
            .unwrap();
        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.processed_count, 3);
        assert_eq!(run.saved_count, 2);
        assert_eq!(run.total_count, 5);
        assert!(run.finished_at.is_some());

        assert!(matches!(
            storage.get_run(999),
            Err(StorageError::RunNotFound(999))
        ));
    }

    #[test]
    fn test_create_fiction_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_fiction_by_key(7).unwrap().is_none());

        storage.create_fiction(&new_fiction(7), at(1, 0, 0)).unwrap();
        let mut renamed = new_fiction(7);
        renamed.title = "Renamed".to_string();
        storage.create_fiction(&renamed, at(2, 0, 0)).unwrap();

        let fiction = storage.get_fiction_by_key(7).unwrap().unwrap();
        assert_eq!(fiction.title, "Fiction 7");
        assert_eq!(fiction.first_seen_at, "2024-03-01T00:00:00.000Z");
        assert!(fiction.last_scraped_at.is_none());
        assert_eq!(storage.count_fictions().unwrap(), 1);
    }

    #[test]
    fn test_upsert_fiction_keeps_first_seen() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_fiction(&new_fiction(7), at(1, 0, 0)).unwrap();

        let record = FictionRecord {
            id: 7,
            title: "Full Title".to_string(),
            status: "ONGOING".to_string(),
            tags: vec!["Fantasy".to_string(), "LitRPG".to_string()],
            ..Default::default()
        };
        storage.upsert_fiction(&record, at(3, 12, 0)).unwrap();

        let fiction = storage.get_fiction_by_key(7).unwrap().unwrap();
        assert_eq!(fiction.title, "Full Title");
        assert_eq!(fiction.status, "ONGOING");
        assert_eq!(fiction.tags, vec!["Fantasy", "LitRPG"]);
        assert_eq!(fiction.first_seen_at, "2024-03-01T00:00:00.000Z");
        assert_eq!(
            fiction.last_scraped_at.as_deref(),
            Some("2024-03-03T12:00:00.000Z")
        );
    }

    #[test]
    fn test_append_snapshot_entries_skips_duplicates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_fiction(&new_fiction(1), at(1, 0, 0)).unwrap();
        storage.create_fiction(&new_fiction(2), at(1, 0, 0)).unwrap();

        let batch = vec![entry(1, "main", 1, at(1, 8, 0)), entry(2, "main", 2, at(1, 8, 0))];
        assert_eq!(storage.append_snapshot_entries(&batch).unwrap(), 2);
        assert_eq!(storage.append_snapshot_entries(&batch).unwrap(), 0);
        assert_eq!(storage.count_snapshot_entries().unwrap(), 2);
    }

    #[test]
    fn test_snapshot_days_and_entries() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for id in 1..=3 {
            storage.create_fiction(&new_fiction(id), at(1, 0, 0)).unwrap();
        }
        storage
            .append_snapshot_entries(&[
                entry(1, "fantasy", 1, at(1, 8, 0)),
                entry(2, "fantasy", 2, at(1, 8, 0)),
                entry(2, "fantasy", 1, at(2, 8, 0)),
                entry(3, "fantasy", 2, at(2, 8, 0)),
                entry(3, "fantasy", 1, at(2, 9, 0)),
                entry(1, "main", 1, at(5, 8, 0)),
            ])
            .unwrap();

        assert_eq!(
            storage.snapshot_days("fantasy", 2).unwrap(),
            vec!["2024-03-02", "2024-03-01"]
        );

        let day = storage.snapshot_entries_for_day("fantasy", "2024-03-02").unwrap();
        assert_eq!(day.len(), 3);
        assert_eq!(day[0].captured_at, at(2, 8, 0));

        let latest = storage.latest_snapshot("fantasy").unwrap();
        assert_eq!(latest, vec![entry(3, "fantasy", 1, at(2, 9, 0))]);

        assert!(storage.latest_snapshot("horror").unwrap().is_empty());
    }

    #[test]
    fn test_genres_due_for_update() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_fiction(&new_fiction(1), at(1, 0, 0)).unwrap();
        storage
            .append_snapshot_entries(&[
                entry(1, "main", 1, at(1, 11, 50)),
                entry(1, "fantasy", 1, at(1, 11, 30)),
            ])
            .unwrap();

        let genres: Vec<String> = ["main", "fantasy", "horror"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let due = storage
            .get_genres_due_for_update(&genres, at(1, 11, 45))
            .unwrap();
        assert_eq!(due, vec!["fantasy", "horror"]);
    }

    #[test]
    fn test_entities_due_respects_history_and_attempts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for id in 1..=5 {
            storage.create_fiction(&new_fiction(id), at(1, 0, 0)).unwrap();
        }
        let now = at(10, 12, 0);
        let policy = DuePolicy::at(now, Duration::hours(24), Duration::hours(1));

        // 1: fresh history
        storage
            .append_fiction_history(&[history(1, now - Duration::hours(2))])
            .unwrap();
        // 2: stale history
        storage
            .append_fiction_history(&[history(2, now - Duration::hours(30))])
            .unwrap();
        // 3: recent retryable failure, still cooling down
        storage
            .record_attempt(&attempt(3, WorkState::FailedRetryable, now - Duration::minutes(10)))
            .unwrap();
        // 4: old retryable failure
        storage
            .record_attempt(&attempt(4, WorkState::FailedRetryable, now - Duration::hours(2)))
            .unwrap();
        // 5: gone recently
        storage
            .record_attempt(&attempt(5, WorkState::Gone, now - Duration::hours(5)))
            .unwrap();

        let due = storage.get_entities_due_for_update(&policy, 10).unwrap();
        assert_eq!(due, vec![4, 2]);

        let limited = storage.get_entities_due_for_update(&policy, 1).unwrap();
        assert_eq!(limited, vec![4]);
    }

    #[test]
    fn test_counts_and_attempt_states() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_fiction(&new_fiction(1), at(1, 0, 0)).unwrap();
        assert_eq!(
            storage
                .append_fiction_history(&[history(1, at(1, 1, 0)), history(1, at(1, 2, 0))])
                .unwrap(),
            2
        );
        storage
            .record_attempt(&attempt(1, WorkState::FailedTerminal, at(1, 3, 0)))
            .unwrap();
        storage
            .record_attempt(&attempt(1, WorkState::FailedTerminal, at(1, 4, 0)))
            .unwrap();

        assert_eq!(storage.count_history_entries().unwrap(), 2);
        let counts = storage.count_attempts_by_state().unwrap();
        assert_eq!(counts.get(&WorkState::FailedTerminal), Some(&2));
        assert_eq!(counts.get(&WorkState::Gone), None);
    }
}
