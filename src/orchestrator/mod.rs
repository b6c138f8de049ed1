//! Batch orchestrator
//!
//! Turns a work list (fictions due for a refresh, or Rising Stars genres due
//! for a capture) into fetches, extractions and batched writes while staying
//! inside the invocation's execution budget.

mod batch;
mod summary;

pub use batch::{BatchSettings, Orchestrator, Phase};
pub use summary::RunSummary;
