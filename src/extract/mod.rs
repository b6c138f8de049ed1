//! Field extraction from fetched HTML documents
//!
//! This module turns raw pages into typed records:
//! - `extract` builds a [`FictionRecord`] from a fiction page
//! - `extract_rising_stars` builds the ranked entries of a Rising Stars listing
//!
//! Extraction never fails. A field whose markup cannot be found degrades to
//! its zero/empty default; only network-level failures reach the caller, and
//! those happen before extraction.

mod fiction;
mod rising_stars;
pub mod strategy;

pub use fiction::{extract, STATUS_VOCABULARY};
pub use rising_stars::{extract_rising_stars, RisingStarEntry};

use serde::{Deserialize, Serialize};

/// Source identifier of a fiction
pub type FictionId = u64;

/// Author block of a fiction page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    /// Profile id, 0 when unknown
    pub id: u64,
    pub avatar: String,
}

/// Numeric statistics of a fiction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FictionStats {
    pub pages: u64,
    pub ratings: u64,
    pub followers: u64,
    pub favorites: u64,
    pub views: u64,
    pub total_views: u64,
    pub average_views: u64,
    pub overall_score: f64,
    pub style_score: f64,
    pub story_score: f64,
    pub grammar_score: f64,
    pub character_score: f64,
    /// Best available single score: overall when present, else any `X / 5` text
    pub score: f64,
}

/// Structured metrics extracted from one fiction page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FictionRecord {
    /// Source id, 0 when the page does not reveal it
    pub id: FictionId,
    pub title: String,
    pub author: Author,
    pub description: String,
    pub image: String,
    pub status: String,
    #[serde(rename = "type")]
    pub fiction_type: String,
    pub tags: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: FictionStats,
}

impl FictionRecord {
    /// Returns the record keyed on the fiction that was requested
    ///
    /// The page's own id only comes from its canonical link, which can point
    /// at another fiction. The requested id always wins.
    pub fn for_fiction(mut self, id: FictionId) -> Self {
        if self.id != 0 && self.id != id {
            tracing::warn!(fiction_id = id, page_id = self.id, "Page reports a different fiction id");
        }
        self.id = id;
        self
    }
}
