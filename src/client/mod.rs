//! Rate-aware HTTP client
//!
//! Every request to the site goes through [`RateAwareClient`], which waits
//! out the configured inter-request delay (capped by the remaining execution
//! budget) and classifies failures into work item outcomes.

pub mod budget;
mod fetcher;
pub mod sleeper;

pub use budget::ProcessingBudget;
pub use fetcher::{
    build_http_client, user_agent_string, FetchError, PageSource, RateAwareClient, RawDocument,
};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};

/// Site path of a fiction page
pub fn fiction_path(id: u64) -> String {
    format!("/fiction/{}", id)
}

/// Site path of a Rising Stars listing
///
/// The `main` genre is the overall list, every other genre has its own page.
pub fn rising_stars_path(genre: &str) -> String {
    if genre == "main" {
        "/fictions/rising-stars".to_string()
    } else {
        format!("/fictions/rising-stars/{}", genre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(fiction_path(12345), "/fiction/12345");
        assert_eq!(rising_stars_path("main"), "/fictions/rising-stars");
        assert_eq!(rising_stars_path("litrpg"), "/fictions/rising-stars/litrpg");
    }
}
