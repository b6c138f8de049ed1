//! Invocation server
//!
//! A small HTTP front end that lets a scheduler or a person trigger batch
//! runs and read movement views. Every endpoint answers with the same JSON
//! envelope.

mod envelope;
mod handlers;

pub use envelope::{Envelope, Reply};
pub use handlers::{InvokeMode, InvokeRequest};

use crate::client::{PageSource, RateAwareClient, Sleeper, TokioSleeper};
use crate::config::Config;
use crate::storage::{open_storage, SqliteStorage};
use crate::StarwatchError;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub config_hash: String,
    pub store: Arc<Mutex<SqliteStorage>>,
    pub source: Arc<dyn PageSource>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl AppState {
    /// Opens the database and builds the HTTP client described by `config`
    pub fn from_config(config: Config, config_hash: String) -> Result<Self, StarwatchError> {
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let source = RateAwareClient::from_config(&config, sleeper.clone())?;
        let store = open_storage(&config.storage)?;

        Ok(Self {
            config: Arc::new(config),
            config_hash,
            store: Arc::new(Mutex::new(store)),
            source: Arc::new(source),
            sleeper,
        })
    }
}

/// Builds the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/invoke", post(handlers::invoke))
        .route("/fiction/:id", post(handlers::fiction))
        .route("/fictions", post(handlers::fictions))
        .route("/rising-stars", post(handlers::rising_stars))
        .route("/movement/:genre", get(handlers::movement))
        .with_state(state)
}

/// Serves the router on the configured address until Ctrl+C
pub async fn serve(state: AppState) -> Result<(), StarwatchError> {
    let addr = state.config.server.addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}
