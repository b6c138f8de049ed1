//! Rank movement classification between two snapshots

use crate::extract::FictionId;
use crate::storage::SnapshotEntry;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// How an entity moved between the previous and current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Absent from the previous snapshot
    New,
    /// Present in both snapshots
    Moved { previous: u32 },
    /// Present previously, absent now
    Dropped { last_position: u32 },
}

/// One entity's movement, derived from two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRecord {
    pub fiction_id: FictionId,
    /// `None` exactly when the entity dropped off the list
    pub current_position: Option<u32>,
    pub movement: Movement,
}

impl MovementRecord {
    pub fn is_new(&self) -> bool {
        self.movement == Movement::New
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self.movement, Movement::Dropped { .. })
    }

    pub fn previous_position(&self) -> Option<u32> {
        match self.movement {
            Movement::Moved { previous } => Some(previous),
            Movement::Dropped { last_position } => Some(last_position),
            Movement::New => None,
        }
    }

    /// Places gained since the previous snapshot, positive when it rose
    pub fn delta(&self) -> Option<i64> {
        match (self.movement, self.current_position) {
            (Movement::Moved { previous }, Some(current)) => {
                Some(i64::from(previous) - i64::from(current))
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MovementView {
    fiction_id: FictionId,
    current_position: Option<u32>,
    previous_position: Option<u32>,
    is_new: bool,
    is_dropped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<i64>,
}

impl Serialize for MovementRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MovementView {
            fiction_id: self.fiction_id,
            current_position: self.current_position,
            previous_position: self.previous_position(),
            is_new: self.is_new(),
            is_dropped: self.is_dropped(),
            delta: self.delta(),
        }
        .serialize(serializer)
    }
}

/// Collapses several passes of one day into one entry per entity
///
/// When an entity appears more than once, the entry with the latest
/// `captured_at` wins. Output is ordered by position, then fiction id.
pub fn latest_per_entity(entries: &[SnapshotEntry]) -> Vec<SnapshotEntry> {
    let mut latest: HashMap<FictionId, &SnapshotEntry> = HashMap::new();
    for entry in entries {
        latest
            .entry(entry.fiction_id)
            .and_modify(|kept| {
                if entry.captured_at > kept.captured_at {
                    *kept = entry;
                }
            })
            .or_insert(entry);
    }

    let mut deduped: Vec<SnapshotEntry> = latest.into_values().cloned().collect();
    deduped.sort_by_key(|e| (e.position, e.fiction_id));
    deduped
}

/// Classifies every entity of `current` against `previous`
///
/// # Arguments
///
/// * `current` - Entries of the current snapshot (may hold several passes)
/// * `previous` - Entries of the previous snapshot, `None` on the first day
///
/// # Returns
///
/// One record per entity of either snapshot: present entities ascending by
/// current position, followed by dropped entities ascending by their last
/// position.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use starwatch::diff;
/// use starwatch::storage::SnapshotEntry;
///
/// let now = Utc::now();
/// let entry = |fiction_id, position| SnapshotEntry {
///     fiction_id,
///     genre: "main".to_string(),
///     position,
///     captured_at: now,
/// };
///
/// let records = diff(&[entry(2, 1)], Some(&[entry(1, 1), entry(2, 2)]));
/// assert_eq!(records[0].delta(), Some(1));
/// assert!(records[1].is_dropped());
/// ```
pub fn diff(current: &[SnapshotEntry], previous: Option<&[SnapshotEntry]>) -> Vec<MovementRecord> {
    let current = latest_per_entity(current);

    let Some(previous) = previous else {
        return current
            .iter()
            .map(|entry| MovementRecord {
                fiction_id: entry.fiction_id,
                current_position: Some(entry.position),
                movement: Movement::New,
            })
            .collect();
    };

    let previous = latest_per_entity(previous);
    let mut previous_positions: HashMap<FictionId, u32> = previous
        .iter()
        .map(|entry| (entry.fiction_id, entry.position))
        .collect();

    let mut records: Vec<MovementRecord> = current
        .iter()
        .map(|entry| {
            let movement = match previous_positions.remove(&entry.fiction_id) {
                Some(previous) => Movement::Moved { previous },
                None => Movement::New,
            };
            MovementRecord {
                fiction_id: entry.fiction_id,
                current_position: Some(entry.position),
                movement,
            }
        })
        .collect();

    // Whatever is left in the map fell off the list; `previous` is already
    // sorted, so dropped entries come out in their old order.
    records.extend(
        previous
            .iter()
            .filter(|entry| previous_positions.contains_key(&entry.fiction_id))
            .map(|entry| MovementRecord {
                fiction_id: entry.fiction_id,
                current_position: None,
                movement: Movement::Dropped {
                    last_position: entry.position,
                },
            }),
    );

    records
}
