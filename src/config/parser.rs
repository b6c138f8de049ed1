use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// Sections other than `[site]`, `[user-agent]` and `[storage]` may be
/// omitted; their keys take the documented defaults.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Reads, parses and validates the TOML file at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use starwatch::config::load_config;
///
/// let config = load_config(Path::new("starwatch.toml")).unwrap();
/// println!("Slice size: {}", config.scraper.fiction_slice_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex-encoded SHA-256 of configuration text
///
/// Runs record this so their counts can be traced back to the settings that
/// produced them.
pub fn config_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Hashes the configuration file at `path` without parsing it
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(config_hash(&std::fs::read_to_string(path)?))
}

/// Loads the configuration and hashes the exact bytes that were parsed
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, config_hash(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[site]
base-url = "https://www.royalroad.com"

[user-agent]
crawler-name = "Starwatch"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "ops@example.com"

[scraper]
request-delay-ms = 250
fiction-slice-size = 20

[storage]
database-path = "./starwatch.db"
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.site.base_url, "https://www.royalroad.com");
        assert_eq!(config.scraper.request_delay_ms, 250);
        assert_eq!(config.scraper.fiction_slice_size, 20);
        assert_eq!(config.user_agent.crawler_name, "Starwatch");
        assert_eq!(config.user_agent.accept_language, "en-US,en;q=0.9");
    }

    #[test]
    fn test_omitted_sections_take_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.scraper.genre_slice_size, 5);
        assert_eq!(config.scraper.rate_limit_cooldown_ms, 5000);
        assert_eq!(config.budget.buffer_ms, 30_000);
        assert_eq!(config.freshness.fiction_hours, 24);
        assert_eq!(config.freshness.rank_minutes, 15);
        assert_eq!(config.rising_stars.top_list_size, 50);
        assert!(config.rising_stars.genres.iter().any(|g| g == "main"));
        assert_eq!(config.server.addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_unreadable_file() {
        let result = load_config(Path::new("/nonexistent/starwatch.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            parse_config("[site\nbase-url ="),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_base_url_is_parse_error() {
        let content = MINIMAL.replace("base-url = \"https://www.royalroad.com\"", "");
        assert!(matches!(parse_config(&content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let content = MINIMAL.replace("fiction-slice-size = 20", "fiction-slice-size = 0");
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_with_hash_matches_file_hash() {
        let file = write_config(MINIMAL);

        let (config, hash) = load_config_with_hash(file.path()).unwrap();

        assert_eq!(config.scraper.fiction_slice_size, 20);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_hash_follows_content() {
        let tuned = MINIMAL.replace("request-delay-ms = 250", "request-delay-ms = 500");
        assert_eq!(config_hash(MINIMAL), config_hash(MINIMAL));
        assert_ne!(config_hash(MINIMAL), config_hash(&tuned));
    }
}
