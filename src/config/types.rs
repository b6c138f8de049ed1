use serde::Deserialize;
use std::time::Duration;

/// Genres tracked when the config does not list any
pub const DEFAULT_GENRES: &[&str] = &[
    "main",
    "action",
    "adventure",
    "comedy",
    "contemporary",
    "drama",
    "fantasy",
    "historical",
    "horror",
    "litrpg",
    "mystery",
    "psychological",
    "romance",
    "sci_fi",
    "progression",
];

/// Main configuration structure for Starwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub freshness: FreshnessConfig,
    #[serde(rename = "rising-stars", default)]
    pub rising_stars: RisingStarsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL every request path is joined onto
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the scraper
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scraper
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for scraper-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,

    /// Value of the Accept-Language header
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

/// Request pacing and batching
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Minimum delay before each outbound request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Extra sleep after a 429 or 5xx before the next item (milliseconds)
    #[serde(rename = "rate-limit-cooldown-ms", default = "default_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fictions processed between two budget checks / store flushes
    #[serde(rename = "fiction-slice-size", default = "default_fiction_slice_size")]
    pub fiction_slice_size: usize,

    /// Genres processed between two budget checks / store flushes
    #[serde(rename = "genre-slice-size", default = "default_genre_slice_size")]
    pub genre_slice_size: usize,

    /// Maximum fictions pulled from the due query per run
    #[serde(rename = "batch-limit", default = "default_batch_limit")]
    pub batch_limit: usize,
}

/// Execution budget of one invocation
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    /// Remaining execution time granted by the host when none is supplied (milliseconds)
    #[serde(rename = "max-execution-ms", default = "default_max_execution_ms")]
    pub max_execution_ms: u64,

    /// Safety margin subtracted from the remaining time (milliseconds)
    #[serde(rename = "buffer-ms", default = "default_buffer_ms")]
    pub buffer_ms: u64,
}

/// Freshness windows deciding what is due
#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
    /// Age a fiction's latest history row must reach before a re-scrape
    #[serde(rename = "fiction-hours", default = "default_fiction_hours")]
    pub fiction_hours: u64,

    /// Age a genre's latest snapshot must reach before a re-scrape
    #[serde(rename = "rank-minutes", default = "default_rank_minutes")]
    pub rank_minutes: u64,

    /// Age a retryable failed attempt must reach before the fiction is due again
    #[serde(rename = "retry-minutes", default = "default_retry_minutes")]
    pub retry_minutes: u64,
}

/// Rising Stars listing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RisingStarsConfig {
    /// Genre slugs to track; "main" is the overall list
    #[serde(default = "default_genres")]
    pub genres: Vec<String>,

    /// Size of the main list used for distance-to-top estimates
    #[serde(rename = "top-list-size", default = "default_top_list_size")]
    pub top_list_size: u32,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Invocation server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl ScraperConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }
}

impl BudgetConfig {
    pub fn max_execution(&self) -> Duration {
        Duration::from_millis(self.max_execution_ms)
    }

    pub fn buffer(&self) -> Duration {
        Duration::from_millis(self.buffer_ms)
    }
}

impl FreshnessConfig {
    pub fn fiction_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.fiction_hours as i64)
    }

    pub fn rank_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.rank_minutes as i64)
    }

    pub fn retry_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.retry_minutes as i64)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            rate_limit_cooldown_ms: default_cooldown_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            fiction_slice_size: default_fiction_slice_size(),
            genre_slice_size: default_genre_slice_size(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_execution_ms: default_max_execution_ms(),
            buffer_ms: default_buffer_ms(),
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            fiction_hours: default_fiction_hours(),
            rank_minutes: default_rank_minutes(),
            retry_minutes: default_retry_minutes(),
        }
    }
}

impl Default for RisingStarsConfig {
    fn default() -> Self {
        Self {
            genres: default_genres(),
            top_list_size: default_top_list_size(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_cooldown_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fiction_slice_size() -> usize {
    10
}

fn default_genre_slice_size() -> usize {
    5
}

fn default_batch_limit() -> usize {
    50
}

fn default_max_execution_ms() -> u64 {
    540_000
}

fn default_buffer_ms() -> u64 {
    30_000
}

fn default_fiction_hours() -> u64 {
    24
}

fn default_rank_minutes() -> u64 {
    15
}

fn default_retry_minutes() -> u64 {
    60
}

fn default_genres() -> Vec<String> {
    DEFAULT_GENRES.iter().map(|g| g.to_string()).collect()
}

fn default_top_list_size() -> u32 {
    50
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}
