//! Budget-aware batch orchestration
//!
//! Work lists are processed in fixed-size slices. Items within a slice run
//! one after another; the budget is checked before every slice and before
//! every item, so an in-flight request always completes but nothing new
//! starts once the deadline has passed. Records produced by a slice are
//! written in one batched append per record type when the slice ends.

use crate::client::{
    fiction_path, rising_stars_path, FetchError, PageSource, ProcessingBudget, Sleeper,
};
use crate::config::Config;
use crate::extract::{extract, extract_rising_stars, FictionId, FictionRecord};
use crate::orchestrator::RunSummary;
use crate::state::WorkState;
use crate::storage::{
    AttemptRecord, AttemptTarget, DuePolicy, HistoryEntry, NewFiction, RunMode, RunStatus,
    SnapshotEntry, Storage, StorageResult,
};
use crate::{Result, StarwatchError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Processing the items of a slice
    Slicing,
    /// Writing the records of the slice just finished
    Draining,
    Done,
}

/// Knobs of a batch run, taken from the configuration
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub fiction_slice_size: usize,
    pub genre_slice_size: usize,
    pub batch_limit: usize,
    pub cooldown: Duration,
    pub fiction_window: chrono::Duration,
    pub rank_window: chrono::Duration,
    pub retry_window: chrono::Duration,
    pub genres: Vec<String>,
    pub config_hash: String,
}

impl BatchSettings {
    pub fn from_config(config: &Config, config_hash: &str) -> Self {
        Self {
            fiction_slice_size: config.scraper.fiction_slice_size,
            genre_slice_size: config.scraper.genre_slice_size,
            batch_limit: config.scraper.batch_limit,
            cooldown: config.scraper.rate_limit_cooldown(),
            fiction_window: config.freshness.fiction_window(),
            rank_window: config.freshness.rank_window(),
            retry_window: config.freshness.retry_window(),
            genres: config.rising_stars.genres.clone(),
            config_hash: config_hash.to_string(),
        }
    }
}

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkItem {
    Fiction(FictionId),
    Genre(String),
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fiction(id) => write!(f, "fiction {}", id),
            Self::Genre(genre) => write!(f, "genre {}", genre),
        }
    }
}

/// Records waiting for the end of the slice
#[derive(Default)]
struct PendingWrites {
    fictions: Vec<(FictionRecord, DateTime<Utc>)>,
    history: Vec<HistoryEntry>,
    snapshots: Vec<SnapshotEntry>,
}

/// Counts of a run so far; survives an aborted run
#[derive(Debug, Default)]
struct Tally {
    processed: usize,
    saved: usize,
    failed: usize,
}

/// Drives fetch, extract and persist over a work list within a budget
pub struct Orchestrator<'a, P: ?Sized, S: ?Sized> {
    source: &'a P,
    store: &'a mut S,
    sleeper: Arc<dyn Sleeper>,
    settings: BatchSettings,
    phase: Phase,
}

impl<'a, P, S> Orchestrator<'a, P, S>
where
    P: PageSource + ?Sized,
    S: Storage + ?Sized,
{
    pub fn new(
        source: &'a P,
        store: &'a mut S,
        sleeper: Arc<dyn Sleeper>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            source,
            store,
            sleeper,
            settings,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "Phase change");
        self.phase = phase;
    }

    // ===== Batch Modes =====

    /// Refreshes detail pages of the fictions due for an update
    ///
    /// # Arguments
    ///
    /// * `budget` - Execution budget of this invocation
    /// * `limit` - Overrides the configured batch limit
    pub async fn run_fictions(
        &mut self,
        budget: &ProcessingBudget,
        limit: Option<usize>,
    ) -> Result<RunSummary> {
        let policy = DuePolicy::at(
            Utc::now(),
            self.settings.fiction_window,
            self.settings.retry_window,
        );
        let limit = limit.unwrap_or(self.settings.batch_limit);
        let items = self
            .store
            .get_entities_due_for_update(&policy, limit)?
            .into_iter()
            .map(WorkItem::Fiction)
            .collect();

        let slice_size = self.settings.fiction_slice_size;
        self.run(RunMode::Fictions, items, slice_size, budget).await
    }

    /// Captures Rising Stars listings
    ///
    /// With `genre` given only that listing is captured, regardless of
    /// freshness. Otherwise every configured genre without a capture inside
    /// the rank freshness window is captured.
    pub async fn run_rising_stars(
        &mut self,
        budget: &ProcessingBudget,
        genre: Option<&str>,
    ) -> Result<RunSummary> {
        let genres = match genre {
            Some(genre) => {
                if !self.settings.genres.iter().any(|g| g == genre) {
                    return Err(StarwatchError::UnknownGenre(genre.to_string()));
                }
                vec![genre.to_string()]
            }
            None => {
                let fresh_after = Utc::now() - self.settings.rank_window;
                self.store
                    .get_genres_due_for_update(&self.settings.genres, fresh_after)?
            }
        };

        let items = genres.into_iter().map(WorkItem::Genre).collect();
        let slice_size = self.settings.genre_slice_size;
        self.run(RunMode::RisingStars, items, slice_size, budget).await
    }

    /// Fetches one fiction outside the due list
    ///
    /// Unknown fictions start being tracked. A 404 surfaces as
    /// [`StarwatchError::FictionGone`].
    pub async fn scrape_fiction(
        &mut self,
        id: FictionId,
        budget: &ProcessingBudget,
    ) -> Result<FictionRecord> {
        let run_id = self
            .store
            .create_run(RunMode::Fiction, &self.settings.config_hash)?;
        let attempted_at = Utc::now();

        match self.source.fetch(&fiction_path(id), budget).await {
            Ok(doc) => {
                let record = extract(&doc.body).for_fiction(id);
                self.store.upsert_fiction(&record, attempted_at)?;
                let saved = self.store.append_fiction_history(&[HistoryEntry {
                    fiction_id: record.id,
                    captured_at: attempted_at,
                    stats: record.stats.clone(),
                }])?;
                self.store.record_attempt(&AttemptRecord {
                    target: AttemptTarget::Fiction,
                    key: id.to_string(),
                    state: WorkState::Succeeded,
                    status_code: Some(doc.status_code),
                    error_message: None,
                    attempted_at,
                })?;
                self.store
                    .finish_run(run_id, RunStatus::Completed, 1, saved, 1)?;

                tracing::info!(fiction_id = id, title = %record.title, "Fiction scraped");
                Ok(record)
            }
            Err(e) => {
                let state = e.work_state();
                let attempt = failed_attempt(AttemptTarget::Fiction, id.to_string(), &e, attempted_at);
                self.store.record_attempt(&attempt)?;

                let status = if state == WorkState::Gone {
                    RunStatus::Completed
                } else {
                    RunStatus::Failed
                };
                self.store.finish_run(run_id, status, 1, 0, 1)?;

                if state == WorkState::Gone {
                    tracing::info!(fiction_id = id, "Fiction is gone upstream");
                    Err(StarwatchError::FictionGone(id))
                } else {
                    tracing::warn!(fiction_id = id, error = %e, "Fiction fetch failed");
                    Err(e.into())
                }
            }
        }
    }

    // ===== Slicing Loop =====

    async fn run(
        &mut self,
        mode: RunMode,
        items: Vec<WorkItem>,
        slice_size: usize,
        budget: &ProcessingBudget,
    ) -> Result<RunSummary> {
        let run_id = self.store.create_run(mode, &self.settings.config_hash)?;
        tracing::info!(
            run_id,
            mode = mode.to_db_string(),
            total = items.len(),
            budget_ms = budget.max_execution_time().as_millis() as u64,
            "Starting batch run"
        );

        let mut tally = Tally::default();
        match self
            .process_slices(&items, slice_size, budget, &mut tally)
            .await
        {
            Ok(()) => {
                let summary = RunSummary::new(
                    tally.processed,
                    tally.saved,
                    tally.failed,
                    items.len(),
                    budget.elapsed(),
                );
                self.store.finish_run(
                    run_id,
                    summary.run_status(),
                    summary.processed_count,
                    summary.saved_count,
                    summary.total_count,
                )?;
                tracing::info!(
                    run_id,
                    processed = summary.processed_count,
                    saved = summary.saved_count,
                    failed = summary.failed_count,
                    remaining = summary.remaining_count,
                    elapsed_ms = summary.execution_time_ms,
                    "Batch run finished"
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    run_id,
                    processed = tally.processed,
                    saved = tally.saved,
                    error = %e,
                    "Batch run failed"
                );
                if let Err(finish_err) = self.store.finish_run(
                    run_id,
                    RunStatus::Failed,
                    tally.processed,
                    tally.saved,
                    items.len(),
                ) {
                    tracing::error!(run_id, error = %finish_err, "Could not mark run as failed");
                }
                Err(e)
            }
        }
    }

    async fn process_slices(
        &mut self,
        items: &[WorkItem],
        slice_size: usize,
        budget: &ProcessingBudget,
        tally: &mut Tally,
    ) -> Result<()> {
        let captured_at = Utc::now();
        let total = items.len();

        for slice in items.chunks(slice_size.max(1)) {
            if budget.is_exhausted() {
                tracing::info!(
                    remaining = total - tally.processed,
                    "Budget exhausted, not starting another slice"
                );
                break;
            }

            self.set_phase(Phase::Slicing);
            let mut pending = PendingWrites::default();
            let mut stopped = false;

            for item in slice {
                if budget.is_exhausted() {
                    tracing::info!(%item, "Budget exhausted mid-slice");
                    stopped = true;
                    break;
                }

                let state = self.process(item, captured_at, budget, &mut pending).await?;
                tally.processed += 1;
                if state.is_failure() {
                    tally.failed += 1;
                }
            }

            self.set_phase(Phase::Draining);
            tally.saved += self.flush(&mut pending)?;

            if stopped {
                break;
            }
        }

        self.set_phase(Phase::Done);
        Ok(())
    }

    // ===== Items =====

    async fn process(
        &mut self,
        item: &WorkItem,
        captured_at: DateTime<Utc>,
        budget: &ProcessingBudget,
        pending: &mut PendingWrites,
    ) -> Result<WorkState> {
        let (target, key, path) = match item {
            WorkItem::Fiction(id) => (AttemptTarget::Fiction, id.to_string(), fiction_path(*id)),
            WorkItem::Genre(genre) => {
                (AttemptTarget::Genre, genre.clone(), rising_stars_path(genre))
            }
        };
        let attempted_at = Utc::now();

        let doc = match self.source.fetch(&path, budget).await {
            Ok(doc) => doc,
            Err(e) => {
                let state = e.work_state();
                if state == WorkState::Gone {
                    tracing::info!(%item, "Gone upstream");
                } else {
                    tracing::warn!(%item, error = %e, outcome = %state, "Fetch failed");
                }
                self.store
                    .record_attempt(&failed_attempt(target, key, &e, attempted_at))?;

                if e.needs_cooldown() {
                    cool_down(self.settings.cooldown, budget, self.sleeper.clone()).await;
                }
                return Ok(state);
            }
        };

        match item {
            WorkItem::Fiction(id) => {
                let record = extract(&doc.body).for_fiction(*id);
                tracing::debug!(fiction_id = id, title = %record.title, "Extracted fiction");
                pending.history.push(HistoryEntry {
                    fiction_id: record.id,
                    captured_at: attempted_at,
                    stats: record.stats.clone(),
                });
                pending.fictions.push((record, attempted_at));
            }
            WorkItem::Genre(genre) => {
                let entries = extract_rising_stars(&doc.body);
                if entries.is_empty() {
                    tracing::warn!(genre = %genre, "Listing had no recognisable entries");
                }
                for entry in entries {
                    if self.store.get_fiction_by_key(entry.fiction_id)?.is_none() {
                        self.store.create_fiction(
                            &NewFiction {
                                id: entry.fiction_id,
                                title: entry.title,
                                author_name: entry.author_name,
                            },
                            captured_at,
                        )?;
                    }
                    pending.snapshots.push(SnapshotEntry {
                        fiction_id: entry.fiction_id,
                        genre: genre.clone(),
                        position: entry.position,
                        captured_at,
                    });
                }
            }
        }

        self.store.record_attempt(&AttemptRecord {
            target,
            key,
            state: WorkState::Succeeded,
            status_code: Some(doc.status_code),
            error_message: None,
            attempted_at,
        })?;
        Ok(WorkState::Succeeded)
    }

    fn flush(&mut self, pending: &mut PendingWrites) -> StorageResult<usize> {
        for (record, scraped_at) in pending.fictions.drain(..) {
            self.store.upsert_fiction(&record, scraped_at)?;
        }

        let mut saved = self.store.append_fiction_history(&pending.history)?;
        saved += self.store.append_snapshot_entries(&pending.snapshots)?;
        pending.history.clear();
        pending.snapshots.clear();

        if saved > 0 {
            tracing::debug!(saved, "Flushed slice");
        }
        Ok(saved)
    }
}

/// Extra pause after a 429 or 5xx, capped by the remaining budget
///
/// Must not borrow the orchestrator: its storage is not `Sync`.
async fn cool_down(cooldown: Duration, budget: &ProcessingBudget, sleeper: Arc<dyn Sleeper>) {
    let pause = cooldown.min(budget.remaining());
    if !pause.is_zero() {
        tracing::debug!(pause_ms = pause.as_millis() as u64, "Cooling down");
        sleeper.sleep(pause).await;
    }
}

fn failed_attempt(
    target: AttemptTarget,
    key: String,
    error: &FetchError,
    attempted_at: DateTime<Utc>,
) -> AttemptRecord {
    AttemptRecord {
        target,
        key,
        state: error.work_state(),
        status_code: error.status_code(),
        error_message: Some(error.to_string()),
        attempted_at,
    }
}
