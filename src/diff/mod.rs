//! Rank-movement diff engine
//!
//! Compares two Rising Stars snapshots of a genre and classifies every
//! fiction as new, moved or dropped, then optionally narrows the result to a
//! focused window around one followed fiction.

mod distance;
mod movement;
mod window;

pub use distance::{distance_to_top, Distance, DEFAULT_TOP_LIST_SIZE};
pub use movement::{diff, latest_per_entity, Movement, MovementRecord};
pub use window::{window, DEFAULT_WINDOW_SIZE};

use crate::extract::FictionId;
use crate::storage::{Storage, StorageResult};
use serde::Serialize;

/// Genre slug of the overall Rising Stars list
pub const MAIN_GENRE: &str = "main";

/// Movement view of one genre between its two latest capture days
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreMovement {
    pub genre: String,
    pub current_day: Option<String>,
    pub previous_day: Option<String>,
    /// Number of records before windowing
    pub total: usize,
    pub movements: Vec<MovementRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
}

/// Builds the movement view of `genre`
///
/// # Arguments
///
/// * `store` - Snapshot source
/// * `genre` - Genre slug
/// * `followed` - Fiction to centre the window on, if any
/// * `size` - Window width
/// * `top_size` - Size of the main list's top section, for the distance estimate
pub fn genre_movement<S: Storage + ?Sized>(
    store: &S,
    genre: &str,
    followed: Option<FictionId>,
    size: usize,
    top_size: u32,
) -> StorageResult<GenreMovement> {
    let days = store.snapshot_days(genre, 2)?;
    let current_day = days.first().cloned();
    let previous_day = days.get(1).cloned();

    let current = match &current_day {
        Some(day) => store.snapshot_entries_for_day(genre, day)?,
        None => Vec::new(),
    };
    let previous = match &previous_day {
        Some(day) => Some(store.snapshot_entries_for_day(genre, day)?),
        None => None,
    };

    let records = diff(&current, previous.as_deref());
    let total = records.len();
    let movements = window(&records, followed, size);

    let distance = match followed {
        Some(id) if genre != MAIN_GENRE => {
            let genre_list = latest_per_entity(&current);
            let main_list = store.latest_snapshot(MAIN_GENRE)?;
            Some(distance_to_top(&genre_list, &main_list, id, top_size))
        }
        _ => None,
    };

    tracing::debug!(genre, total, shown = movements.len(), "Built movement view");

    Ok(GenreMovement {
        genre: genre.to_string(),
        current_day,
        previous_day,
        total,
        movements,
        distance,
    })
}
