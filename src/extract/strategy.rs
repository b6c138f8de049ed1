//! Building blocks for ordered fallback strategies
//!
//! Every extracted field is described as a list of pure
//! `fn(&Html) -> Option<T>` strategies. The first strategy returning `Some`
//! wins, so a markup change upstream only silences the strategies that depend
//! on it.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// A single way of locating a value in a parsed document
pub type Strategy<T> = fn(&Html) -> Option<T>;

/// Runs the strategies in order and returns the first hit
pub fn first_some<T>(document: &Html, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(document))
}

/// Parses a CSS selector, tolerating invalid input
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Text content of an element with whitespace collapsed
pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// First matching element with non-empty text
pub fn select_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .find_map(|element| clean(&element_text(&element)))
}

/// First matching element carrying a non-empty attribute
pub fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .find_map(|element| element.value().attr(attr).and_then(clean))
}

/// Text of every matching element, trimmed, empties and duplicates dropped
pub fn select_all_text(document: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    let mut values: Vec<String> = Vec::new();
    for element in document.select(&sel) {
        if let Some(value) = clean(&element_text(&element)) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// Like [`select_all_text`], but `None` when nothing was found
pub fn non_empty_list(document: &Html, css: &str) -> Option<Vec<String>> {
    let values = select_all_text(document, css);
    (!values.is_empty()).then_some(values)
}

/// Trims, collapses whitespace and decodes leftover entities; `None` if empty
///
/// The HTML parser already decodes one level of entities. Sites that escape
/// twice leave sequences such as `&amp;#39;` behind, which are decoded here by
/// running the value through the parser once more.
pub fn clean(raw: &str) -> Option<String> {
    let mut value = collapse_whitespace(raw);
    if value.contains('&') && value.contains(';') {
        let fragment = Html::parse_fragment(&value);
        value = collapse_whitespace(&fragment.root_element().text().collect::<String>());
    }
    (!value.is_empty()).then_some(value)
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a count such as `1,234` (thousands separators stripped)
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '.' && !c.is_whitespace())
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parses a score and clamps it to `[0, 5]`
pub fn parse_score(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 5.0))
}

/// Runs a list of single-capture patterns and parses the first hit as a count
pub fn first_count(text: &str, patterns: &[Regex]) -> Option<u64> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_count(m.as_str()))
    })
}

/// Extracts a numeric fiction id from a `/fiction/{id}` style URL or path
pub fn fiction_id_from_href(href: &str) -> Option<u64> {
    let (_, rest) = href.split_once("/fiction/")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|id| *id > 0)
}

/// Extracts a numeric profile id from a `/profile/{id}` style URL or path
pub fn profile_id_from_href(href: &str) -> Option<u64> {
    let (_, rest) = href.split_once("/profile/")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|id| *id > 0)
}
