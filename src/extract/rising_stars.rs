//! Rising Stars listing extractor

use crate::extract::strategy::{
    clean, element_text, fiction_id_from_href, first_some, selector, Strategy,
};
use crate::extract::FictionId;
use scraper::{ElementRef, Html};
use serde::Serialize;

/// One ranked entry of a Rising Stars listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RisingStarEntry {
    pub fiction_id: FictionId,
    /// 1-based rank in the listing
    pub position: u32,
    pub title: String,
    pub author_name: String,
    pub tags: Vec<String>,
}

/// An entry before its rank is assigned
struct Listed {
    fiction_id: FictionId,
    title: String,
    author_name: String,
    tags: Vec<String>,
}

const LISTING_STRATEGIES: &[Strategy<Vec<Listed>>] = &[
    list_items,
    title_anchors,
    any_fiction_anchor,
];

/// Extracts the ranked entries of a Rising Stars listing page
///
/// Positions are the 1-based document order after duplicate fictions are
/// removed. An unrecognisable page yields an empty list.
pub fn extract_rising_stars(html: &str) -> Vec<RisingStarEntry> {
    let document = Html::parse_document(html);
    let listed = first_some(&document, LISTING_STRATEGIES).unwrap_or_default();

    listed
        .into_iter()
        .enumerate()
        .map(|(index, item)| RisingStarEntry {
            fiction_id: item.fiction_id,
            position: index as u32 + 1,
            title: item.title,
            author_name: item.author_name,
            tags: item.tags,
        })
        .collect()
}

/// `.fiction-list-item` blocks carrying a title link, author and tags
fn list_items(document: &Html) -> Option<Vec<Listed>> {
    let item_sel = selector(".fiction-list-item")?;
    let title_sel = selector(".fiction-title a, h2 a")?;
    let author_sel = selector(".author a, a[href*='/profile/']")?;
    let tag_sel = selector(".tags a, a.fiction-tag")?;

    let mut listed = Vec::new();
    for item in document.select(&item_sel) {
        let Some(anchor) = item.select(&title_sel).find(|a| anchor_fiction_id(a).is_some()) else {
            continue;
        };
        let Some(fiction_id) = anchor_fiction_id(&anchor) else {
            continue;
        };

        let author_name = item
            .select(&author_sel)
            .find_map(|a| clean(&element_text(&a)))
            .unwrap_or_default();

        let mut tags: Vec<String> = Vec::new();
        for tag in item.select(&tag_sel) {
            if let Some(tag) = clean(&element_text(&tag)) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }

        push_unique(
            &mut listed,
            Listed {
                fiction_id,
                title: clean(&element_text(&anchor)).unwrap_or_default(),
                author_name,
                tags,
            },
        );
    }

    (!listed.is_empty()).then_some(listed)
}

/// Title anchors without the surrounding list-item markup
fn title_anchors(document: &Html) -> Option<Vec<Listed>> {
    anchors_matching(document, ".fiction-title a")
}

/// Any anchor pointing at a fiction, in document order
fn any_fiction_anchor(document: &Html) -> Option<Vec<Listed>> {
    anchors_matching(document, "a[href*='/fiction/']")
}

fn anchors_matching(document: &Html, css: &str) -> Option<Vec<Listed>> {
    let sel = selector(css)?;

    let mut listed = Vec::new();
    for anchor in document.select(&sel) {
        let Some(fiction_id) = anchor_fiction_id(&anchor) else {
            continue;
        };
        // Cover-image links share the href but carry no text
        let Some(title) = clean(&element_text(&anchor)) else {
            continue;
        };
        push_unique(
            &mut listed,
            Listed {
                fiction_id,
                title,
                author_name: String::new(),
                tags: Vec::new(),
            },
        );
    }

    (!listed.is_empty()).then_some(listed)
}

fn anchor_fiction_id(anchor: &ElementRef) -> Option<FictionId> {
    anchor.value().attr("href").and_then(fiction_id_from_href)
}

fn push_unique(listed: &mut Vec<Listed>, item: Listed) {
    if !listed.iter().any(|l| l.fiction_id == item.fiction_id) {
        listed.push(item);
    }
}
