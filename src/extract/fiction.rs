//! Fiction page extractor
//!
//! Each field of [`FictionRecord`] is located through an ordered list of
//! strategies. Class names on the source site drift, so most chains end in a
//! structural or vocabulary-based fallback rather than a fixed selector.

use crate::extract::strategy::{
    clean, element_text, fiction_id_from_href, first_count, first_some,
    non_empty_list, parse_score, profile_id_from_href, select_attr, select_text, selector,
    Strategy,
};
use crate::extract::{Author, FictionRecord, FictionStats};
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

/// Publication states recognised by exact text membership
pub const STATUS_VOCABULARY: &[&str] = &[
    "ONGOING",
    "COMPLETED",
    "HIATUS",
    "DROPPED",
    "STUB",
    "INACTIVE",
];

/// Fiction types recognised by exact text membership
const TYPE_VOCABULARY: &[&str] = &["ORIGINAL", "FAN FICTION"];

/// Extracts a [`FictionRecord`] from a fiction page
///
/// The function is pure: the same input always produces the same record, and
/// missing markup yields default values instead of errors.
///
/// # Example
///
/// ```
/// use starwatch::extract::extract;
///
/// let html = r#"<div class="fiction-stats">Pages : 1,234</div>"#;
/// let record = extract(html);
/// assert_eq!(record.stats.pages, 1234);
/// assert_eq!(record.title, "");
/// ```
pub fn extract(html: &str) -> FictionRecord {
    let document = Html::parse_document(html);

    FictionRecord {
        id: first_some(&document, ID_STRATEGIES).unwrap_or_default(),
        title: first_some(&document, TITLE_STRATEGIES).unwrap_or_default(),
        author: Author {
            name: first_some(&document, AUTHOR_NAME_STRATEGIES).unwrap_or_default(),
            id: first_some(&document, AUTHOR_ID_STRATEGIES).unwrap_or_default(),
            avatar: first_some(&document, AVATAR_STRATEGIES).unwrap_or_default(),
        },
        description: first_some(&document, DESCRIPTION_STRATEGIES).unwrap_or_default(),
        image: first_some(&document, IMAGE_STRATEGIES).unwrap_or_default(),
        status: first_some(&document, STATUS_STRATEGIES).unwrap_or_default(),
        fiction_type: first_some(&document, TYPE_STRATEGIES).unwrap_or_default(),
        tags: first_some(&document, TAG_STRATEGIES).unwrap_or_default(),
        warnings: first_some(&document, WARNING_STRATEGIES).unwrap_or_default(),
        stats: extract_stats(&document),
    }
}

// ===== Free-text fields =====

const ID_STRATEGIES: &[Strategy<u64>] = &[
    |d| select_attr(d, "link[rel='canonical']", "href").and_then(|h| fiction_id_from_href(&h)),
    |d| select_attr(d, "meta[property='og:url']", "content").and_then(|h| fiction_id_from_href(&h)),
    |d| select_attr(d, "[data-fiction-id]", "data-fiction-id").and_then(|v| v.parse().ok()),
];

const TITLE_STRATEGIES: &[Strategy<String>] = &[
    |d| select_text(d, ".fic-header h1"),
    |d| select_text(d, ".fic-title h1"),
    |d| select_attr(d, "meta[property='og:title']", "content"),
    |d| select_text(d, "h1"),
    |d| select_text(d, "title").and_then(|t| strip_site_suffix(&t)),
];

const AUTHOR_NAME_STRATEGIES: &[Strategy<String>] = &[
    |d| select_text(d, ".fic-header h4 a"),
    |d| select_text(d, ".fic-title h4 a"),
    |d| select_text(d, "a[href*='/profile/']"),
    |d| select_attr(d, "meta[property='books:author']", "content"),
    |d| select_attr(d, "meta[name='author']", "content"),
];

const AUTHOR_ID_STRATEGIES: &[Strategy<u64>] = &[
    |d| select_attr(d, ".fic-header h4 a", "href").and_then(|h| profile_id_from_href(&h)),
    |d| select_attr(d, ".fic-title h4 a", "href").and_then(|h| profile_id_from_href(&h)),
    |d| select_attr(d, "a[href*='/profile/']", "href").and_then(|h| profile_id_from_href(&h)),
];

const AVATAR_STRATEGIES: &[Strategy<String>] = &[
    |d| select_attr(d, "img[data-type='avatar']", "src"),
    |d| select_attr(d, ".portlet-body .avatar-container img", "src"),
    |d| select_attr(d, "img.avatar", "src"),
];

const DESCRIPTION_STRATEGIES: &[Strategy<String>] = &[
    |d| select_text(d, ".description .hidden-content"),
    |d| select_text(d, ".description"),
    |d| select_attr(d, "meta[property='og:description']", "content"),
    |d| select_attr(d, "meta[name='description']", "content"),
];

const IMAGE_STRATEGIES: &[Strategy<String>] = &[
    |d| select_attr(d, ".cover-art-container img", "src"),
    |d| select_attr(d, "img[data-type='cover']", "src"),
    |d| select_attr(d, "meta[property='og:image']", "content"),
    |d| select_attr(d, ".fic-header img.thumbnail", "src"),
];

const STATUS_STRATEGIES: &[Strategy<String>] = &[
    |d| scan_vocabulary(d, ".fiction-info span.label", STATUS_VOCABULARY),
    |d| scan_vocabulary(d, "span.label", STATUS_VOCABULARY),
    |d| scan_vocabulary(d, "span, a, li, div", STATUS_VOCABULARY),
];

const TYPE_STRATEGIES: &[Strategy<String>] = &[
    |d| scan_vocabulary(d, ".fiction-info span.label", TYPE_VOCABULARY),
    |d| scan_vocabulary(d, "span.label", TYPE_VOCABULARY),
    |d| scan_vocabulary(d, "span, a, li, div", TYPE_VOCABULARY),
];

const TAG_STRATEGIES: &[Strategy<Vec<String>>] = &[
    |d| non_empty_list(d, ".tags a.fiction-tag"),
    |d| non_empty_list(d, ".tags a"),
    |d| non_empty_list(d, "a[href*='tagsAdd=']"),
];

const WARNING_STRATEGIES: &[Strategy<Vec<String>>] = &[
    |d| non_empty_list(d, ".content-warnings li"),
    |d| non_empty_list(d, ".fiction-info .font-red-sunglo ul li"),
    |d| non_empty_list(d, ".font-red-sunglo ul.list-inline li"),
];

/// Finds the first element whose whole text is a member of the vocabulary
///
/// Matching is on the full trimmed text, case-insensitive, so container
/// elements that merely contain a vocabulary word never match.
fn scan_vocabulary(document: &Html, css: &str, vocabulary: &[&str]) -> Option<String> {
    let sel = selector(css)?;
    document.select(&sel).find_map(|element| {
        let text = element_text(&element).to_uppercase();
        vocabulary
            .iter()
            .find(|word| **word == text)
            .map(|word| word.to_string())
    })
}

fn strip_site_suffix(title: &str) -> Option<String> {
    let base = title.split(" | ").next().unwrap_or(title);
    clean(base)
}

// ===== Stats =====

struct StatPatterns {
    pages: Vec<Regex>,
    ratings: Vec<Regex>,
    followers: Vec<Regex>,
    favorites: Vec<Regex>,
    views: Vec<Regex>,
    total_views: Vec<Regex>,
    average_views: Vec<Regex>,
    score_text: Regex,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("stat pattern is valid"))
        .collect()
}

fn stat_patterns() -> &'static StatPatterns {
    static PATTERNS: OnceLock<StatPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| StatPatterns {
        pages: compile(&[r"(?i)Pages\s*:\s*([\d,]+)", r"(?i)([\d,]+)\s+Pages\b"]),
        ratings: compile(&[r"(?i)Ratings\s*:\s*([\d,]+)", r"(?i)([\d,]+)\s+Ratings\b"]),
        followers: compile(&[r"(?i)Followers\s*:\s*([\d,]+)", r"(?i)([\d,]+)\s+Followers\b"]),
        favorites: compile(&[
            r"(?i)Favou?rites\s*:\s*([\d,]+)",
            r"(?i)([\d,]+)\s+Favou?rites\b",
        ]),
        views: compile(&[
            r"(?i)Page\s*Views\s*:\s*([\d,]+)",
            r"(?i)([\d,]+)\s+Views\b",
            r"(?i)Total\s*Views\s*:\s*([\d,]+)",
        ]),
        total_views: compile(&[
            r"(?i)Total\s*Views\s*:\s*([\d,]+)",
            r"(?i)([\d,]+)\s+Total\s+Views\b",
        ]),
        average_views: compile(&[
            r"(?i)Average\s*Views\s*:\s*([\d,]+)",
            r"(?i)([\d,]+)\s+Average\s+Views\b",
        ]),
        score_text: Regex::new(r"(-?\d+(?:\.\d+)?)\s*/\s*5\b").expect("score pattern is valid"),
    })
}

/// Text of the stats container, falling back to the whole body
const STATS_TEXT_STRATEGIES: &[Strategy<String>] = &[
    |d| select_text(d, ".fiction-stats"),
    |d| select_text(d, ".stats-content"),
    |d| select_text(d, "body"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreLabel {
    Overall,
    Style,
    Story,
    Grammar,
    Character,
}

impl ScoreLabel {
    fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("overall") {
            Some(Self::Overall)
        } else if label.contains("style") {
            Some(Self::Style)
        } else if label.contains("story") {
            Some(Self::Story)
        } else if label.contains("grammar") {
            Some(Self::Grammar)
        } else if label.contains("character") {
            Some(Self::Character)
        } else {
            None
        }
    }
}

fn extract_stats(document: &Html) -> FictionStats {
    let patterns = stat_patterns();
    let text = first_some(document, STATS_TEXT_STRATEGIES).unwrap_or_default();

    let mut stats = FictionStats {
        pages: first_count(&text, &patterns.pages).unwrap_or(0),
        ratings: first_count(&text, &patterns.ratings).unwrap_or(0),
        followers: first_count(&text, &patterns.followers).unwrap_or(0),
        favorites: first_count(&text, &patterns.favorites).unwrap_or(0),
        views: first_count(&text, &patterns.views).unwrap_or(0),
        total_views: first_count(&text, &patterns.total_views).unwrap_or(0),
        average_views: first_count(&text, &patterns.average_views).unwrap_or(0),
        ..FictionStats::default()
    };

    let mut structured = false;
    for (label, value) in structured_scores(document, &patterns.score_text) {
        structured = true;
        match label {
            ScoreLabel::Overall => stats.overall_score = value,
            ScoreLabel::Style => stats.style_score = value,
            ScoreLabel::Story => stats.story_score = value,
            ScoreLabel::Grammar => stats.grammar_score = value,
            ScoreLabel::Character => stats.character_score = value,
        }
    }

    stats.score = if structured {
        stats.overall_score
    } else {
        patterns
            .score_text
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_score(m.as_str()))
            .unwrap_or(0.0)
    };

    stats
}

/// Collects `(label, score)` pairs from `data-content="X / 5"` markup
///
/// The label comes from the element's `aria-label`, falling back to the
/// tooltip title. The first value seen for a label wins.
fn structured_scores(document: &Html, score_text: &Regex) -> Vec<(ScoreLabel, f64)> {
    let Some(sel) = selector("[data-content]") else {
        return Vec::new();
    };

    let mut found: Vec<(ScoreLabel, f64)> = Vec::new();
    for element in document.select(&sel) {
        let attrs = element.value();
        let Some(content) = attrs.attr("data-content") else {
            continue;
        };
        let Some(value) = score_text
            .captures(content)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_score(m.as_str()))
        else {
            continue;
        };

        let label = attrs
            .attr("aria-label")
            .and_then(ScoreLabel::from_label)
            .or_else(|| {
                attrs
                    .attr("data-original-title")
                    .and_then(ScoreLabel::from_label)
            })
            .or_else(|| attrs.attr("title").and_then(ScoreLabel::from_label));

        if let Some(label) = label {
            if !found.iter().any(|(seen, _)| *seen == label) {
                found.push((label, value));
            }
        }
    }
    found
}
