//! Human-readable digest of statistics and day patterns.

use serde::{Deserialize, Serialize};

use crate::types::{DayPattern, StudentStatistic};

use super::statistics::rounded_mean_rate;

/// Returned by [`build_summary`] when there are no statistics.
pub const INSUFFICIENT_DATA_MESSAGE: &str = "Not enough attendance data to analyze.";

/// Students below this rate are listed as low attendance.
pub const LOW_ATTENDANCE_RATE: u32 = 80;

/// Students with at least this many late arrivals are listed as frequently late.
pub const FREQUENT_LATENESS_COUNT: u32 = 3;

/// Maximum number of students named in each list.
pub const HIGHLIGHT_LIMIT: usize = 5;

/// Local analysis: highlighted students, day patterns, and the summary text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAnalysis {
    pub worst_attendance: Vec<StudentStatistic>,
    pub frequent_lateness: Vec<StudentStatistic>,
    #[serde(rename = "patternFound")]
    pub patterns: Vec<DayPattern>,
    pub summary: String,
}

impl LocalAnalysis {
    /// Derive highlights and summary from computed statistics and patterns.
    pub fn new(stats: &[StudentStatistic], patterns: Vec<DayPattern>) -> Self {
        let summary = build_summary(stats, &patterns);
        Self {
            worst_attendance: lowest_attendance(stats),
            frequent_lateness: frequent_lateness(stats),
            patterns,
            summary,
        }
    }
}

/// Up to five students under [`LOW_ATTENDANCE_RATE`], lowest rate first.
///
/// Ties keep their original order.
pub fn lowest_attendance(stats: &[StudentStatistic]) -> Vec<StudentStatistic> {
    let mut low: Vec<StudentStatistic> = stats
        .iter()
        .filter(|s| s.attendance_rate < LOW_ATTENDANCE_RATE)
        .cloned()
        .collect();
    low.sort_by_key(|s| s.attendance_rate);
    low.truncate(HIGHLIGHT_LIMIT);
    low
}

/// Up to five students late at least [`FREQUENT_LATENESS_COUNT`] times, most late first.
///
/// Ties keep their original order.
pub fn frequent_lateness(stats: &[StudentStatistic]) -> Vec<StudentStatistic> {
    let mut late: Vec<StudentStatistic> = stats
        .iter()
        .filter(|s| s.late_count >= FREQUENT_LATENESS_COUNT)
        .cloned()
        .collect();
    late.sort_by_key(|s| std::cmp::Reverse(s.late_count));
    late.truncate(HIGHLIGHT_LIMIT);
    late
}

/// Render the digest sentence by sentence.
///
/// Always states the average rate; names low-attendance and frequently late
/// students and appends pattern messages only when there are any.
pub fn build_summary(stats: &[StudentStatistic], patterns: &[DayPattern]) -> String {
    let Some(average) = rounded_mean_rate(stats) else {
        return INSUFFICIENT_DATA_MESSAGE.to_string();
    };

    let mut summary = format!(
        "Average attendance across {} {} is {}%.",
        stats.len(),
        plural(stats.len(), "student", "students"),
        average
    );

    let low = lowest_attendance(stats);
    if !low.is_empty() {
        summary.push_str(&format!(
            " Low attendance: {} ({} {}).",
            names(&low),
            low.len(),
            plural(low.len(), "student", "students")
        ));
    }

    let late = frequent_lateness(stats);
    if !late.is_empty() {
        summary.push_str(&format!(
            " Frequently late: {} ({} {}).",
            names(&late),
            late.len(),
            plural(late.len(), "student", "students")
        ));
    }

    if !patterns.is_empty() {
        let messages: Vec<&str> = patterns.iter().map(|p| p.message.as_str()).collect();
        summary.push_str(" Notable patterns: ");
        summary.push_str(&messages.join(" "));
    }

    summary
}

fn names(stats: &[StudentStatistic]) -> String {
    stats
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}
