//! Request handlers

use crate::client::ProcessingBudget;
use crate::diff::{genre_movement, DEFAULT_WINDOW_SIZE};
use crate::extract::FictionId;
use crate::orchestrator::{BatchSettings, Orchestrator};
use crate::server::envelope::Reply;
use crate::server::AppState;
use crate::StarwatchError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

/// Batch selected by an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvokeMode {
    Fiction,
    Fictions,
    RisingStars,
}

/// Body of `POST /invoke`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub mode: Option<InvokeMode>,
    pub fiction_id: Option<FictionId>,
    pub genre: Option<String>,
    pub limit: Option<usize>,
    /// Time the host still grants this invocation
    pub remaining_time_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuery {
    pub genre: Option<String>,
    pub limit: Option<usize>,
    pub remaining_time_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub follow: Option<FictionId>,
    pub size: Option<usize>,
}

// ===== Handlers =====

pub async fn healthz() -> Reply {
    Reply::data(&json!({ "status": "ok" }), Instant::now())
}

pub async fn invoke(
    State(state): State<AppState>,
    body: Result<Json<InvokeRequest>, JsonRejection>,
) -> Reply {
    let started = Instant::now();
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return Reply::bad_request(rejection.body_text(), started),
    };

    // A bare fiction id is enough to pick the single-fiction mode
    let mode = match (request.mode, request.fiction_id) {
        (Some(mode), _) => mode,
        (None, Some(_)) => InvokeMode::Fiction,
        (None, None) => return Reply::bad_request("mode is required", started),
    };
    tracing::info!(?mode, "Invocation received");

    let budget = budget_for(&state, request.remaining_time_ms);
    match mode {
        InvokeMode::Fiction => match request.fiction_id {
            Some(id) => scrape_one(&state, id, &budget, started).await,
            None => Reply::bad_request("fictionId is required for mode fiction", started),
        },
        InvokeMode::Fictions => run_fictions(&state, request.limit, &budget, started).await,
        InvokeMode::RisingStars => {
            run_rising_stars(&state, request.genre.as_deref(), &budget, started).await
        }
    }
}

pub async fn fiction(
    State(state): State<AppState>,
    id: Result<Path<FictionId>, PathRejection>,
) -> Reply {
    let started = Instant::now();
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return Reply::bad_request(rejection.body_text(), started),
    };

    let budget = budget_for(&state, None);
    scrape_one(&state, id, &budget, started).await
}

pub async fn fictions(
    State(state): State<AppState>,
    query: Result<Query<BatchQuery>, QueryRejection>,
) -> Reply {
    let started = Instant::now();
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return Reply::bad_request(rejection.body_text(), started),
    };

    let budget = budget_for(&state, query.remaining_time_ms);
    run_fictions(&state, query.limit, &budget, started).await
}

pub async fn rising_stars(
    State(state): State<AppState>,
    query: Result<Query<BatchQuery>, QueryRejection>,
) -> Reply {
    let started = Instant::now();
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return Reply::bad_request(rejection.body_text(), started),
    };

    let budget = budget_for(&state, query.remaining_time_ms);
    run_rising_stars(&state, query.genre.as_deref(), &budget, started).await
}

pub async fn movement(
    State(state): State<AppState>,
    Path(genre): Path<String>,
    query: Result<Query<MovementQuery>, QueryRejection>,
) -> Reply {
    let started = Instant::now();
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return Reply::bad_request(rejection.body_text(), started),
    };

    if !state.config.rising_stars.genres.contains(&genre) {
        return Reply::bad_request(format!("Unknown genre: {}", genre), started);
    }

    let size = query.size.unwrap_or(DEFAULT_WINDOW_SIZE);
    if size == 0 {
        return Reply::bad_request("size must be at least 1", started);
    }

    let store = state.store.lock().await;
    match genre_movement(
        &*store,
        &genre,
        query.follow,
        size,
        state.config.rising_stars.top_list_size,
    ) {
        Ok(view) => Reply::data(&view, started),
        Err(e) => Reply::error(&StarwatchError::from(e), started),
    }
}

// ===== Helpers =====

/// Budget for this invocation: the host's remaining time minus the buffer
/// when given, the configured ceiling otherwise
fn budget_for(state: &AppState, remaining_time_ms: Option<u64>) -> ProcessingBudget {
    let budget = &state.config.budget;
    match remaining_time_ms {
        Some(ms) => ProcessingBudget::from_remaining(Duration::from_millis(ms), budget.buffer()),
        None => ProcessingBudget::new(budget.max_execution(), budget.buffer()),
    }
}

fn settings(state: &AppState) -> BatchSettings {
    BatchSettings::from_config(&state.config, &state.config_hash)
}

async fn scrape_one(
    state: &AppState,
    id: FictionId,
    budget: &ProcessingBudget,
    started: Instant,
) -> Reply {
    let mut store = state.store.lock().await;
    let mut orchestrator = Orchestrator::new(
        state.source.as_ref(),
        &mut *store,
        state.sleeper.clone(),
        settings(state),
    );

    match orchestrator.scrape_fiction(id, budget).await {
        Ok(record) => Reply::data(&record, started),
        Err(e) => Reply::error(&e, started),
    }
}

async fn run_fictions(
    state: &AppState,
    limit: Option<usize>,
    budget: &ProcessingBudget,
    started: Instant,
) -> Reply {
    let mut store = state.store.lock().await;
    let mut orchestrator = Orchestrator::new(
        state.source.as_ref(),
        &mut *store,
        state.sleeper.clone(),
        settings(state),
    );

    match orchestrator.run_fictions(budget, limit).await {
        Ok(summary) => Reply::summary(&summary, started),
        Err(e) => Reply::error(&e, started),
    }
}

async fn run_rising_stars(
    state: &AppState,
    genre: Option<&str>,
    budget: &ProcessingBudget,
    started: Instant,
) -> Reply {
    let mut store = state.store.lock().await;
    let mut orchestrator = Orchestrator::new(
        state.source.as_ref(),
        &mut *store,
        state.sleeper.clone(),
        settings(state),
    );

    match orchestrator.run_rising_stars(budget, genre).await {
        Ok(summary) => Reply::summary(&summary, started),
        Err(e) => Reply::error(&e, started),
    }
}
