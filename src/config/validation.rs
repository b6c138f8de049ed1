use crate::config::types::{
    BudgetConfig, Config, FreshnessConfig, RisingStarsConfig, ScraperConfig, ServerConfig,
    SiteConfig, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_scraper_config(&config.scraper)?;
    validate_budget_config(&config.budget)?;
    validate_freshness_config(&config.freshness)?;
    validate_rising_stars_config(&config.rising_stars)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates the upstream site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url has no host: '{}'",
            config.base_url
        )));
    }

    Ok(())
}

/// The User-Agent header is `Name/Version (+url; email)`, so name and
/// version must be valid product tokens
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let is_token = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    };

    if !is_token(&config.crawler_name) {
        return Err(ConfigError::Validation(format!(
            "crawler_name must be a non-empty product token, got '{}'",
            config.crawler_name
        )));
    }

    if !is_token(&config.crawler_version) {
        return Err(ConfigError::Validation(format!(
            "crawler_version must be a non-empty product token, got '{}'",
            config.crawler_version
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("contact_url: {}", e)))?;
    validate_email(&config.contact_email)?;

    if config.accept_language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "accept_language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates request pacing and slice sizes
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.fiction_slice_size < 1 || config.fiction_slice_size > 100 {
        return Err(ConfigError::Validation(format!(
            "fiction_slice_size must be between 1 and 100, got {}",
            config.fiction_slice_size
        )));
    }

    if config.genre_slice_size < 1 || config.genre_slice_size > 100 {
        return Err(ConfigError::Validation(format!(
            "genre_slice_size must be between 1 and 100, got {}",
            config.genre_slice_size
        )));
    }

    if config.batch_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_limit must be >= 1, got {}",
            config.batch_limit
        )));
    }

    Ok(())
}

/// Validates the execution budget
fn validate_budget_config(config: &BudgetConfig) -> Result<(), ConfigError> {
    if config.buffer_ms >= config.max_execution_ms {
        return Err(ConfigError::Validation(format!(
            "buffer_ms ({}) must be smaller than max_execution_ms ({})",
            config.buffer_ms, config.max_execution_ms
        )));
    }

    Ok(())
}

/// Validates freshness windows
fn validate_freshness_config(config: &FreshnessConfig) -> Result<(), ConfigError> {
    if config.fiction_hours < 1 {
        return Err(ConfigError::Validation(
            "fiction_hours must be >= 1".to_string(),
        ));
    }

    if config.rank_minutes < 1 {
        return Err(ConfigError::Validation(
            "rank_minutes must be >= 1".to_string(),
        ));
    }

    // A retry window longer than the freshness window would never apply
    if config.retry_minutes > config.fiction_hours * 60 {
        return Err(ConfigError::Validation(format!(
            "retry_minutes ({}) cannot exceed fiction_hours ({}h)",
            config.retry_minutes, config.fiction_hours
        )));
    }

    Ok(())
}

/// Validates the tracked genre list
fn validate_rising_stars_config(config: &RisingStarsConfig) -> Result<(), ConfigError> {
    if config.genres.is_empty() {
        return Err(ConfigError::Validation(
            "at least one rising-stars genre is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for genre in &config.genres {
        validate_genre_slug(genre)?;
        if !seen.insert(genre.as_str()) {
            return Err(ConfigError::Validation(format!(
                "genre '{}' is listed twice",
                genre
            )));
        }
    }

    if config.top_list_size < 1 {
        return Err(ConfigError::Validation(
            "top_list_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the listen address of the invocation server
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.addr.parse::<SocketAddr>().map_err(|_| {
        ConfigError::Validation(format!("Invalid server addr: '{}'", config.addr))
    })?;

    Ok(())
}

/// Genre slugs end up in request paths, so only URL-safe characters are allowed
fn validate_genre_slug(genre: &str) -> Result<(), ConfigError> {
    if genre.is_empty() {
        return Err(ConfigError::Validation(
            "genre cannot be empty".to_string(),
        ));
    }

    if !genre
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "genre '{}' must contain only lowercase letters, digits, '_' or '-'",
            genre
        )));
    }

    Ok(())
}

/// Contact address sanity check: one `@`, a local part and a dotted domain
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    };

    if !valid {
        return Err(ConfigError::Validation(format!(
            "contact_email is not a usable address: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_site_config() {
        let ok = SiteConfig {
            base_url: "https://www.royalroad.com".to_string(),
        };
        assert!(validate_site_config(&ok).is_ok());

        let local = SiteConfig {
            base_url: "http://127.0.0.1:8081".to_string(),
        };
        assert!(validate_site_config(&local).is_ok());

        let bad = SiteConfig {
            base_url: "ftp://example.com".to_string(),
        };
        assert!(matches!(
            validate_site_config(&bad),
            Err(ConfigError::InvalidUrl(_))
        ));

        let garbage = SiteConfig {
            base_url: "not a url".to_string(),
        };
        assert!(validate_site_config(&garbage).is_err());
    }

    #[test]
    fn test_validate_genre_slug() {
        assert!(validate_genre_slug("main").is_ok());
        assert!(validate_genre_slug("sci_fi").is_ok());
        assert!(validate_genre_slug("slice-of-life").is_ok());

        assert!(validate_genre_slug("").is_err());
        assert!(validate_genre_slug("Sci Fi").is_err());
        assert!(validate_genre_slug("../admin").is_err());
    }

    #[test]
    fn test_duplicate_genres_rejected() {
        let config = RisingStarsConfig {
            genres: vec!["main".to_string(), "main".to_string()],
            top_list_size: 50,
        };
        assert!(validate_rising_stars_config(&config).is_err());
    }

    #[test]
    fn test_budget_buffer_must_fit() {
        let config = BudgetConfig {
            max_execution_ms: 1000,
            buffer_ms: 1000,
        };
        assert!(validate_budget_config(&config).is_err());

        let config = BudgetConfig {
            max_execution_ms: 1000,
            buffer_ms: 100,
        };
        assert!(validate_budget_config(&config).is_ok());
    }

    #[test]
    fn test_retry_window_bounded_by_freshness() {
        let config = FreshnessConfig {
            fiction_hours: 1,
            rank_minutes: 15,
            retry_minutes: 61,
        };
        assert!(validate_freshness_config(&config).is_err());
    }

    #[test]
    fn test_validate_server_addr() {
        let ok = ServerConfig {
            addr: "0.0.0.0:3000".to_string(),
        };
        assert!(validate_server_config(&ok).is_ok());

        let bad = ServerConfig {
            addr: "localhost".to_string(),
        };
        assert!(validate_server_config(&bad).is_err());
    }

    #[test]
    fn test_user_agent_tokens() {
        let mut config = UserAgentConfig {
            crawler_name: "Starwatch".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "ops@example.com".to_string(),
            accept_language: "en-US".to_string(),
        };
        assert!(validate_user_agent_config(&config).is_ok());

        config.crawler_name = "Star Watch".to_string();
        assert!(validate_user_agent_config(&config).is_err());

        config.crawler_name = "Starwatch".to_string();
        config.crawler_version = String::new();
        assert!(validate_user_agent_config(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
