//! Output module for reporting on tracked data

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, TrackerStatistics};
