//! HTTP fetcher implementation
//!
//! This module handles all outbound requests, including:
//! - Building HTTP clients with the scraper's user agent and static headers
//! - Pacing requests against the remaining execution budget
//! - Error classification

use crate::client::budget::ProcessingBudget;
use crate::client::sleeper::Sleeper;
use crate::config::{Config, UserAgentConfig};
use crate::state::WorkState;
use crate::StarwatchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Request path relative to the site
    pub path: String,
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Failure to obtain a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection reset, timeout, DNS failure or unreadable body
    #[error("Network error for {path}: {message}")]
    Network { path: String, message: String },

    /// Non-success HTTP status
    #[error("HTTP {status} for {path}")]
    Status { path: String, status: u16 },

    /// The path could not be joined onto the base URL
    #[error("Invalid request path {path}: {message}")]
    InvalidPath { path: String, message: String },
}

impl FetchError {
    /// Maps the failure onto the work item outcome
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | HTTP 404 | Gone |
    /// | HTTP 429, 5xx | FailedRetryable |
    /// | Network error | FailedRetryable |
    /// | Other 4xx / 3xx | FailedTerminal |
    /// | Invalid path | FailedTerminal |
    pub fn work_state(&self) -> WorkState {
        match self {
            Self::Status { status: 404, .. } => WorkState::Gone,
            Self::Status { status, .. } if *status == 429 || *status >= 500 => {
                WorkState::FailedRetryable
            }
            Self::Status { .. } => WorkState::FailedTerminal,
            Self::Network { .. } => WorkState::FailedRetryable,
            Self::InvalidPath { .. } => WorkState::FailedTerminal,
        }
    }

    /// True when the orchestrator should cool down before its next request
    pub fn needs_cooldown(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == 429 || *status >= 500)
    }

    /// HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for the 404 tombstone outcome
    pub fn is_gone(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Source of pages for the orchestrator
///
/// Implemented by [`RateAwareClient`]; tests substitute scripted sources.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(
        &self,
        path: &str,
        budget: &ProcessingBudget,
    ) -> Result<RawDocument, FetchError>;
}

/// Formats the user agent string: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with the static header set
///
/// Accept-Encoding is negotiated by reqwest itself (gzip and brotli are
/// enabled), the remaining headers are fixed for every request.
///
/// # Example
///
/// ```no_run
/// use starwatch::config::UserAgentConfig;
/// use starwatch::client::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Starwatch".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
///     accept_language: "en-US,en;q=0.9".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Client::builder()
        .user_agent(user_agent_string(config))
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP client that paces requests against the execution budget
///
/// Before each request it sleeps `min(request_delay, budget.remaining())`.
/// Once the budget is spent the sleep is skipped entirely; the orchestrator
/// is expected to have stopped issuing requests by then already.
pub struct RateAwareClient {
    client: Client,
    base_url: Url,
    request_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RateAwareClient {
    pub fn new(
        client: Client,
        base_url: Url,
        request_delay: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client,
            base_url,
            request_delay,
            sleeper,
        }
    }

    /// Builds the client described by the configuration
    pub fn from_config(config: &Config, sleeper: Arc<dyn Sleeper>) -> Result<Self, StarwatchError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.scraper.request_timeout_secs),
        )?;
        let base_url = Url::parse(&config.site.base_url)?;
        Ok(Self::new(
            client,
            base_url,
            config.scraper.request_delay(),
            sleeper,
        ))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Delay applied before the next request, `None` when it is skipped
    pub fn delay_for(&self, budget: &ProcessingBudget) -> Option<Duration> {
        let remaining = budget.remaining();
        if remaining.is_zero() || self.request_delay.is_zero() {
            return None;
        }
        Some(self.request_delay.min(remaining))
    }

    async fn get(&self, path: &str) -> Result<RawDocument, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::InvalidPath {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let response = self.client.get(url).send().await.map_err(|e| {
            // Classify error
            let message = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            FetchError::Network {
                path: path.to_string(),
                message,
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Network {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(RawDocument {
            path: path.to_string(),
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PageSource for RateAwareClient {
    async fn fetch(
        &self,
        path: &str,
        budget: &ProcessingBudget,
    ) -> Result<RawDocument, FetchError> {
        if let Some(delay) = self.delay_for(budget) {
            self.sleeper.sleep(delay).await;
        }

        tracing::debug!(path, "GET");
        let result = self.get(path).await;
        if let Err(e) = &result {
            tracing::debug!(path, error = %e, "fetch failed");
        }
        result
    }
}
