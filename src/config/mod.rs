//! Configuration module for Starwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use starwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("starwatch.toml")).unwrap();
//! println!("Scraping {}", config.site.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BudgetConfig, Config, FreshnessConfig, RisingStarsConfig, ScraperConfig, ServerConfig,
    SiteConfig, StorageConfig, UserAgentConfig, DEFAULT_GENRES,
};

// Re-export parser functions
pub use parser::{compute_config_hash, config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
