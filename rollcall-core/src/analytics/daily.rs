//! Per-date status counts for one class (trend view).

use serde::Serialize;

use crate::types::{AttendanceHistory, AttendanceStatus};

/// Status counts for one class on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTally {
    pub date: String,
    pub present: u32,
    pub late: u32,
    pub absent: u32,
}

impl DailyTally {
    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent
    }

    /// `MM-DD` label for compact display.
    pub fn short_label(&self) -> &str {
        self.date.get(5..).unwrap_or(&self.date)
    }
}

/// Counts for the most recent `days` dates in the history, oldest first.
///
/// Dates on which the class has no entries still appear, with zero counts.
pub fn daily_tally(history: &AttendanceHistory, class_id: &str, days: usize) -> Vec<DailyTally> {
    let skip = history.len().saturating_sub(days);

    history
        .iter()
        .skip(skip)
        .map(|(date, day)| {
            let mut tally = DailyTally {
                date: date.clone(),
                present: 0,
                late: 0,
                absent: 0,
            };
            for entry in day.get(class_id).into_iter().flat_map(|c| c.values()) {
                match entry.status {
                    AttendanceStatus::Present => tally.present += 1,
                    AttendanceStatus::Late => tally.late += 1,
                    AttendanceStatus::Absent => tally.absent += 1,
                }
            }
            tally
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttendanceEntry;

    fn history() -> AttendanceHistory {
        let mut history = AttendanceHistory::new();
        let rows = [
            ("2024-03-04", "A", 1, AttendanceStatus::Present),
            ("2024-03-04", "A", 2, AttendanceStatus::Late),
            ("2024-03-05", "A", 1, AttendanceStatus::Absent),
            ("2024-03-05", "B", 3, AttendanceStatus::Absent),
            ("2024-03-06", "B", 3, AttendanceStatus::Present),
        ];
        for (date, class, id, status) in rows {
            history
                .entry(date.to_string())
                .or_default()
                .entry(class.to_string())
                .or_default()
                .insert(id, AttendanceEntry::new(status));
        }
        history
    }

    #[test]
    fn test_tally_counts_one_class() {
        let tallies = daily_tally(&history(), "A", 14);
        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[0].present, 1);
        assert_eq!(tallies[0].late, 1);
        assert_eq!(tallies[1].absent, 1);
        assert_eq!(tallies[2].total(), 0);
        assert_eq!(tallies[0].short_label(), "03-04");
    }

    #[test]
    fn test_tally_keeps_most_recent_dates() {
        let tallies = daily_tally(&history(), "B", 2);
        let dates: Vec<_> = tallies.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-05", "2024-03-06"]);
    }
}
