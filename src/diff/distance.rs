//! Estimated distance from a genre list to the main Rising Stars list

use crate::extract::FictionId;
use crate::storage::SnapshotEntry;
use serde::Serialize;
use std::collections::HashMap;

/// Size of the main list's visible top section
pub const DEFAULT_TOP_LIST_SIZE: u32 = 50;

/// Where a followed fiction stands relative to the main list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Distance {
    /// Already ranked on the main list
    #[serde(rename_all = "camelCase")]
    OnList { position: u32 },

    /// Not on the main list; position extrapolated from a shared anchor
    #[serde(rename_all = "camelCase")]
    Estimated {
        estimated_position: u32,
        /// Places to climb before reaching the last spot of the top section
        places_to_top: u32,
        anchor_fiction_id: FictionId,
    },

    /// Neither list gives anything to extrapolate from
    Unknown,
}

/// Estimates how far `followed` is from the top of the main list
///
/// The anchor is the lowest-ranked genre entry above `followed` that is also
/// on the main list. Every genre place between the anchor and `followed` is
/// assumed to cost one main-list place.
pub fn distance_to_top(
    genre_list: &[SnapshotEntry],
    main_list: &[SnapshotEntry],
    followed: FictionId,
    top_size: u32,
) -> Distance {
    let main_positions: HashMap<FictionId, u32> = main_list
        .iter()
        .map(|entry| (entry.fiction_id, entry.position))
        .collect();

    if let Some(&position) = main_positions.get(&followed) {
        return Distance::OnList { position };
    }

    let Some(genre_position) = genre_list
        .iter()
        .find(|entry| entry.fiction_id == followed)
        .map(|entry| entry.position)
    else {
        return Distance::Unknown;
    };

    let anchor = genre_list
        .iter()
        .filter(|entry| entry.position < genre_position)
        .filter_map(|entry| {
            main_positions
                .get(&entry.fiction_id)
                .map(|&main_position| (entry, main_position))
        })
        .max_by_key(|(entry, _)| entry.position);

    match anchor {
        Some((entry, main_position)) => {
            let estimated_position = main_position + (genre_position - entry.position);
            Distance::Estimated {
                estimated_position,
                places_to_top: estimated_position.saturating_sub(top_size),
                anchor_fiction_id: entry.fiction_id,
            }
        }
        None => Distance::Unknown,
    }
}
