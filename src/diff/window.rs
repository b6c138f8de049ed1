//! Focused window around one followed entity

use crate::diff::MovementRecord;
use crate::extract::FictionId;

/// Default number of rows in a focused view
pub const DEFAULT_WINDOW_SIZE: usize = 13;

/// Selects a contiguous slice of `records` centred on `followed`
///
/// - `followed` is `None`: the list is returned unchanged.
/// - `followed` is on the list at index `i`: the slice starts
///   `(size + 1) / 2` rows above it (never so many that it falls out of the
///   slice) and is shifted to stay inside the list.
///   For the default width of 13 that is `[i - 7, i + 6)`.
/// - `followed` is not on the list: the trailing `size` rows.
///
/// The result always holds `min(size, records.len())` rows when a followed
/// id is given. Positions are never recomputed.
pub fn window(
    records: &[MovementRecord],
    followed: Option<FictionId>,
    size: usize,
) -> Vec<MovementRecord> {
    let Some(followed) = followed else {
        return records.to_vec();
    };

    let len = records.len();
    let (start, end) = match records.iter().position(|r| r.fiction_id == followed) {
        Some(index) => {
            let before = ((size + 1) / 2).min(size.saturating_sub(1));
            let start = index.saturating_sub(before);
            let end = len.min(start + size);
            (end.saturating_sub(size), end)
        }
        None => (len.saturating_sub(size), len),
    };

    records[start..end].to_vec()
}
