//! Analytics module for rollcall
//!
//! Pure functions over an immutable roster and attendance history:
//! - Per-student statistics
//! - Day-of-week absence and lateness patterns
//! - Summary digest of the two
//! - Per-date tallies for trend display
//!
//! Nothing here performs I/O or mutates its inputs.

pub mod daily;
pub mod patterns;
pub mod statistics;
pub mod summary;

pub use daily::{daily_tally, DailyTally};
pub use patterns::{detect_day_patterns, ABSENCE_THRESHOLD, LATENESS_THRESHOLD};
pub use statistics::{compute_statistics, rounded_mean_rate};
pub use summary::{
    build_summary, frequent_lateness, lowest_attendance, LocalAnalysis,
    INSUFFICIENT_DATA_MESSAGE,
};
