//! Day-of-week attendance patterns.

use crate::types::{
    parse_date_key, AttendanceHistory, AttendanceStatus, DayPattern, PatternType, Weekday,
};

use super::statistics::rounded_percent;

/// Absence rate (percent) at or above which a weekday is flagged.
pub const ABSENCE_THRESHOLD: u64 = 15;

/// Lateness rate (percent) at or above which a weekday is flagged.
pub const LATENESS_THRESHOLD: u64 = 20;

#[derive(Debug, Clone, Copy, Default)]
struct WeekdayTally {
    total: u64,
    absent: u64,
    late: u64,
}

/// Detect weekdays with unusually high absence or lateness.
///
/// Every recorded entry on a date counts toward that date's weekday, across all
/// classes and students. Weekdays without entries are skipped. Output is
/// ordered by weekday (Sunday first), absence before lateness.
///
/// Date keys that are not calendar dates are skipped.
pub fn detect_day_patterns(history: &AttendanceHistory) -> Vec<DayPattern> {
    let mut tallies = [WeekdayTally::default(); 7];

    for (date_key, day) in history {
        let Some(date) = parse_date_key(date_key) else {
            tracing::warn!(date = %date_key, "Skipping history entry with invalid date");
            continue;
        };
        let tally = &mut tallies[Weekday::of(date).index()];

        for entry in day.values().flat_map(|class| class.values()) {
            tally.total += 1;
            match entry.status {
                AttendanceStatus::Absent => tally.absent += 1,
                AttendanceStatus::Late => tally.late += 1,
                AttendanceStatus::Present => {}
            }
        }
    }

    let mut patterns = Vec::new();

    for (weekday, tally) in Weekday::ALL.iter().zip(tallies.iter()) {
        if tally.total == 0 {
            continue;
        }

        if tally.absent * 100 >= ABSENCE_THRESHOLD * tally.total {
            patterns.push(day_pattern(
                *weekday,
                PatternType::Absence,
                tally.absent,
                tally.total,
            ));
        }

        if tally.late * 100 >= LATENESS_THRESHOLD * tally.total {
            patterns.push(day_pattern(
                *weekday,
                PatternType::Lateness,
                tally.late,
                tally.total,
            ));
        }
    }

    patterns
}

fn day_pattern(day: Weekday, pattern_type: PatternType, count: u64, total: u64) -> DayPattern {
    let rate = rounded_percent(count, total).unwrap_or(0);
    DayPattern {
        day,
        pattern_type,
        rate,
        message: format!(
            "{} shows a high {} rate ({}%).",
            day.label(),
            pattern_type.as_str(),
            rate
        ),
    }
}
