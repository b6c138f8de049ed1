//! State module for tracking work items
//!
//! `WorkState` classifies the outcome of each fiction or genre attempted by a
//! run: succeeded, gone upstream, or failed (retryable or terminal).

mod work_state;

pub use work_state::WorkState;
