//! Core domain types for rollcall
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Class** | A named group of students sharing one attendance roster |
//! | **Roster** | Students grouped by class, in display order |
//! | **Entry** | One student's status for one class on one date |
//! | **History** | Every entry, keyed date → class → student |
//! | **Statistic** | Per-student aggregate derived from the history |
//! | **Day pattern** | A weekday whose absence or lateness rate crosses a threshold |
//!
//! A missing entry means "no record for that day". It is never read as absent
//! and never counted in a rate denominator.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Globally unique student identifier, assigned monotonically.
pub type StudentId = u64;

/// Class identifier (free-form name such as `"1"` or `"3-B"`).
pub type ClassId = String;

/// Calendar date key in ISO `YYYY-MM-DD` form.
pub type DateKey = String;

/// Students grouped by class.
pub type Roster = BTreeMap<ClassId, Vec<Student>>;

/// Entries for one class on one date.
pub type ClassAttendance = BTreeMap<StudentId, AttendanceEntry>;

/// Entries for every class on one date.
pub type DayAttendance = BTreeMap<ClassId, ClassAttendance>;

/// Full attendance history, date → class → student → entry.
pub type AttendanceHistory = BTreeMap<DateKey, DayAttendance>;

/// Date format used for history keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a history date key as a literal calendar date (no timezone).
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_FORMAT).ok()
}

/// Format a calendar date as a history key.
pub fn date_key(date: NaiveDate) -> DateKey {
    date.format(DATE_FORMAT).to_string()
}

// ============================================
// Roster
// ============================================

/// A student on a class roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Unique across all classes
    pub id: StudentId,
    /// Seat number, unique within the class
    pub number: u32,
    /// Display name
    pub name: String,
}

// ============================================
// Attendance
// ============================================

/// Daily attendance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
        }
    }

    /// Late arrivals count toward attendance.
    pub fn counts_as_attending(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "late" => Ok(AttendanceStatus::Late),
            "absent" => Ok(AttendanceStatus::Absent),
            _ => Err(format!("unknown attendance status: {}", s)),
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded status with optional free-text context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AttendanceEntry {
    /// Entry with a status and no reason or note.
    pub fn new(status: AttendanceStatus) -> Self {
        Self {
            status,
            reason: None,
            note: None,
        }
    }
}

// ============================================
// Derived values
// ============================================

/// Per-student aggregate over every recorded date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatistic {
    pub id: StudentId,
    pub name: String,
    pub class: ClassId,
    pub number: u32,
    pub total_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    /// Rounded percentage of recorded days present or late; 100 with no records
    pub attendance_rate: u32,
    pub late_count: u32,
    pub absent_count: u32,
}

/// Day of week, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All weekdays, Sunday (0) through Saturday (6).
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Weekday of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_sunday() as usize]
    }

    /// 0 = Sunday … 6 = Saturday
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of weekday anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Absence,
    Lateness,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Absence => "absence",
            PatternType::Lateness => "lateness",
        }
    }
}

/// A weekday whose absence or lateness rate crossed its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPattern {
    pub day: Weekday,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    /// Rounded percentage
    pub rate: u32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
        ] {
            assert_eq!(status.as_str().parse::<AttendanceStatus>(), Ok(status));
        }
        assert!("tardy".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_weekday_from_calendar_date() {
        // 2024-03-04 was a Monday
        let date = parse_date_key("2024-03-04").unwrap();
        assert_eq!(Weekday::of(date), Weekday::Monday);
        assert_eq!(Weekday::of(date).index(), 1);

        let sunday = parse_date_key("2024-03-10").unwrap();
        assert_eq!(Weekday::of(sunday), Weekday::Sunday);
    }

    #[test]
    fn test_parse_date_key_rejects_garbage() {
        assert!(parse_date_key("2024-13-01").is_none());
        assert!(parse_date_key("yesterday").is_none());
        assert_eq!(
            date_key(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()),
            "2024-03-04"
        );
    }

    #[test]
    fn test_history_deserializes_numeric_student_keys() {
        let json = r#"{"2024-03-04":{"A":{"1":{"status":"late","reason":"bus"}}}}"#;
        let history: AttendanceHistory = serde_json::from_str(json).unwrap();
        let entry = &history["2024-03-04"]["A"][&1];
        assert_eq!(entry.status, AttendanceStatus::Late);
        assert_eq!(entry.reason.as_deref(), Some("bus"));
        assert!(entry.note.is_none());
    }
}
