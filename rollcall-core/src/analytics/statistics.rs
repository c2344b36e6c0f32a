//! Per-student attendance statistics.

use crate::types::{AttendanceHistory, AttendanceStatus, Roster, StudentStatistic};

/// Rate reported for a student with no recorded days.
pub const NO_RECORD_RATE: u32 = 100;

/// Round `100 * part / whole` to the nearest integer, halves rounding up.
///
/// Returns `None` when `whole` is zero.
pub fn rounded_percent(part: u64, whole: u64) -> Option<u32> {
    if whole == 0 {
        return None;
    }
    Some(((200 * part + whole) / (2 * whole)) as u32)
}

/// Compute a [`StudentStatistic`] for every student on the roster.
///
/// Output order is class order, then roster order within each class. Entries
/// for students absent from `roster` are ignored, and a date with no entry for
/// a student does not count toward that student's `total_days`.
pub fn compute_statistics(roster: &Roster, history: &AttendanceHistory) -> Vec<StudentStatistic> {
    let mut stats = Vec::new();

    for (class_id, students) in roster {
        for student in students {
            let mut total_days = 0u32;
            let mut present_days = 0u32;
            let mut late_days = 0u32;
            let mut absent_days = 0u32;

            let entries = history
                .values()
                .filter_map(|day| day.get(class_id))
                .filter_map(|class_attendance| class_attendance.get(&student.id));

            for entry in entries {
                total_days += 1;
                match entry.status {
                    AttendanceStatus::Present => present_days += 1,
                    AttendanceStatus::Late => late_days += 1,
                    AttendanceStatus::Absent => absent_days += 1,
                }
            }

            let attendance_rate = rounded_percent(
                u64::from(present_days + late_days),
                u64::from(total_days),
            )
            .unwrap_or(NO_RECORD_RATE);

            stats.push(StudentStatistic {
                id: student.id,
                name: student.name.clone(),
                class: class_id.clone(),
                number: student.number,
                total_days,
                present_days,
                late_days,
                absent_days,
                attendance_rate,
                late_count: late_days,
                absent_count: absent_days,
            });
        }
    }

    stats
}

/// Mean of the per-student rates, rounded half up; `None` for an empty slice.
pub fn rounded_mean_rate(stats: &[StudentStatistic]) -> Option<u32> {
    let sum: u64 = stats.iter().map(|s| u64::from(s.attendance_rate)).sum();
    // The mean of percentages is itself a percentage of (count * 100).
    rounded_percent(sum, stats.len() as u64 * 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttendanceEntry, Student};
    use std::collections::BTreeMap;

    fn kim_roster() -> Roster {
        let mut roster = Roster::new();
        roster.insert(
            "A".to_string(),
            vec![Student {
                id: 1,
                number: 1,
                name: "Kim".to_string(),
            }],
        );
        roster
    }

    fn history_of(entries: &[(&str, &str, u64, AttendanceStatus)]) -> AttendanceHistory {
        let mut history = AttendanceHistory::new();
        for (date, class, id, status) in entries {
            history
                .entry(date.to_string())
                .or_insert_with(BTreeMap::new)
                .entry(class.to_string())
                .or_insert_with(BTreeMap::new)
                .insert(*id, AttendanceEntry::new(*status));
        }
        history
    }

    #[test]
    fn test_basic_rate() {
        let history = history_of(&[
            ("2024-03-04", "A", 1, AttendanceStatus::Present),
            ("2024-03-05", "A", 1, AttendanceStatus::Late),
            ("2024-03-06", "A", 1, AttendanceStatus::Absent),
        ]);

        let stats = compute_statistics(&kim_roster(), &history);
        assert_eq!(stats.len(), 1);
        let kim = &stats[0];
        assert_eq!(kim.total_days, 3);
        assert_eq!(kim.present_days, 1);
        assert_eq!(kim.late_days, 1);
        assert_eq!(kim.absent_days, 1);
        assert_eq!(kim.attendance_rate, 67);
        assert_eq!(kim.late_count, 1);
        assert_eq!(kim.absent_count, 1);
    }

    #[test]
    fn test_missing_day_is_excluded() {
        let mut history = history_of(&[
            ("2024-03-04", "A", 1, AttendanceStatus::Present),
            ("2024-03-05", "A", 1, AttendanceStatus::Absent),
        ]);
        // A third date exists, but Kim has no entry on it.
        history
            .entry("2024-03-06".to_string())
            .or_default()
            .insert("A".to_string(), BTreeMap::new());

        let stats = compute_statistics(&kim_roster(), &history);
        assert_eq!(stats[0].total_days, 2);
        assert_eq!(stats[0].attendance_rate, 50);
    }

    #[test]
    fn test_no_records_means_full_attendance() {
        let stats = compute_statistics(&kim_roster(), &AttendanceHistory::new());
        assert_eq!(stats[0].total_days, 0);
        assert_eq!(stats[0].attendance_rate, NO_RECORD_RATE);
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        assert!(compute_statistics(&Roster::new(), &AttendanceHistory::new()).is_empty());
    }

    #[test]
    fn test_orphaned_entries_are_ignored() {
        let history = history_of(&[
            ("2024-03-04", "A", 1, AttendanceStatus::Present),
            ("2024-03-04", "A", 99, AttendanceStatus::Absent),
            ("2024-03-04", "Z", 1, AttendanceStatus::Absent),
        ]);

        let stats = compute_statistics(&kim_roster(), &history);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_days, 1);
        assert_eq!(stats[0].attendance_rate, 100);
    }

    #[test]
    fn test_removing_student_leaves_others_untouched() {
        let mut roster = kim_roster();
        roster.get_mut("A").unwrap().push(Student {
            id: 2,
            number: 2,
            name: "Lee".to_string(),
        });
        let history = history_of(&[
            ("2024-03-04", "A", 1, AttendanceStatus::Present),
            ("2024-03-04", "A", 2, AttendanceStatus::Absent),
            ("2024-03-05", "A", 1, AttendanceStatus::Late),
            ("2024-03-05", "A", 2, AttendanceStatus::Present),
        ]);

        let before = compute_statistics(&roster, &history);
        roster.get_mut("A").unwrap().retain(|s| s.id != 2);
        let after = compute_statistics(&roster, &history);

        assert_eq!(after.len(), 1);
        assert!(after.iter().all(|s| s.id != 2));
        assert_eq!(after[0], before[0]);
    }

    #[test]
    fn test_rates_stay_in_bounds() {
        let mut roster = kim_roster();
        roster.get_mut("A").unwrap().push(Student {
            id: 2,
            number: 2,
            name: "Lee".to_string(),
        });
        let history = history_of(&[
            ("2024-03-04", "A", 1, AttendanceStatus::Absent),
            ("2024-03-05", "A", 1, AttendanceStatus::Absent),
            ("2024-03-04", "A", 2, AttendanceStatus::Late),
        ]);

        for stat in compute_statistics(&roster, &history) {
            assert!(stat.attendance_rate <= 100);
        }
    }

    #[test]
    fn test_rounded_percent_rounds_half_up() {
        assert_eq!(rounded_percent(2, 3), Some(67));
        assert_eq!(rounded_percent(1, 3), Some(33));
        assert_eq!(rounded_percent(1, 8), Some(13)); // 12.5
        assert_eq!(rounded_percent(3, 20), Some(15));
        assert_eq!(rounded_percent(0, 0), None);
    }

    #[test]
    fn test_mean_rate() {
        let history = history_of(&[("2024-03-04", "A", 1, AttendanceStatus::Absent)]);
        let mut roster = kim_roster();
        roster.get_mut("A").unwrap().push(Student {
            id: 2,
            number: 2,
            name: "Lee".to_string(),
        });
        let stats = compute_statistics(&roster, &history);
        // Kim 0%, Lee 100% (no records)
        assert_eq!(rounded_mean_rate(&stats), Some(50));
        assert_eq!(rounded_mean_rate(&[]), None);
    }
}
