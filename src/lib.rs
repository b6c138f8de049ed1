//! Starwatch: a Rising Stars rank tracker
//!
//! This crate harvests fiction pages and ranked "Rising Stars" genre listings
//! from a fiction-hosting site, extracts structured metrics, and tracks how
//! fictions move through the ranked lists over time.

pub mod client;
pub mod config;
pub mod diff;
pub mod extract;
pub mod orchestrator;
pub mod output;
pub mod server;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Starwatch operations
#[derive(Debug, Error)]
pub enum StarwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] client::FetchError),

    #[error("Fiction {0} no longer exists upstream")]
    FictionGone(u64),

    #[error("Unknown genre: {0}")]
    UnknownGenre(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Starwatch operations
pub type Result<T> = std::result::Result<T, StarwatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use client::{ProcessingBudget, RateAwareClient};
pub use config::Config;
pub use diff::{diff, window, MovementRecord};
pub use extract::{extract, FictionRecord};
pub use orchestrator::RunSummary;
pub use state::WorkState;
