//! Analysis export, analysis import, and record backups.
//!
//! Both file formats are plain JSON with camelCase names so they stay
//! interchangeable with files produced by other tools reading the same data.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::analytics::statistics::rounded_mean_rate;
use crate::analytics::summary::LocalAnalysis;
use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::{AttendanceHistory, DayPattern, Roster};

/// `metadata.analysisType` of every analysis export.
pub const EXPORT_ANALYSIS_TYPE: &str = "attendance_analysis";

/// `metadata.version` of every analysis export.
pub const EXPORT_VERSION: &str = "1.0";

// ============================================
// Analysis export
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub export_date: DateTime<Utc>,
    pub analysis_type: String,
    pub version: String,
}

/// Aggregates copied out of the local analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    /// Rounded mean rate; absent when there were no students
    pub average_attendance: Option<u32>,
    /// Number of frequently late students highlighted
    pub late_students: usize,
    /// Number of low-attendance students highlighted
    pub absent_students: usize,
    pub patterns: Vec<DayPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawData {
    pub student_count: usize,
    pub attendance_stats: AttendanceStats,
}

/// A saved analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisExport {
    pub metadata: ExportMetadata,
    #[serde(default)]
    pub ai_result: Option<String>,
    #[serde(default)]
    pub local_analysis: LocalAnalysis,
    #[serde(default)]
    pub raw_data: RawData,
}

impl AnalysisExport {
    pub fn from_result(result: &AnalysisResult, now: DateTime<Utc>) -> Self {
        let local = &result.local_analysis;
        Self {
            metadata: ExportMetadata {
                export_date: now,
                analysis_type: EXPORT_ANALYSIS_TYPE.to_string(),
                version: EXPORT_VERSION.to_string(),
            },
            ai_result: result.generated_text.clone(),
            local_analysis: local.clone(),
            raw_data: RawData {
                student_count: result.statistics.len(),
                attendance_stats: AttendanceStats {
                    average_attendance: rounded_mean_rate(&result.statistics),
                    late_students: local.frequent_lateness.len(),
                    absent_students: local.worst_attendance.len(),
                    patterns: local.patterns.clone(),
                },
            },
        }
    }

    /// `attendance_analysis_YYYY-MM-DD.json`
    pub fn default_file_name(date: NaiveDate) -> String {
        format!("attendance_analysis_{}.json", date.format("%Y-%m-%d"))
    }

    /// Write as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// The parts of an export that can be shown again after import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedAnalysis {
    pub export: AnalysisExport,
}

impl ImportedAnalysis {
    pub fn ai_result(&self) -> Option<&str> {
        self.export.ai_result.as_deref()
    }

    pub fn local_analysis(&self) -> &LocalAnalysis {
        &self.export.local_analysis
    }
}

/// Parse an analysis export, rejecting anything that is not one.
pub fn parse_imported_analysis(json: &str) -> Result<ImportedAnalysis> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| Error::Import(format!("not valid JSON: {}", e)))?;

    let analysis_type = value
        .get("metadata")
        .and_then(|m| m.get("analysisType"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| Error::Import("missing metadata.analysisType".to_string()))?;
    if analysis_type != EXPORT_ANALYSIS_TYPE {
        return Err(Error::Import(format!(
            "unsupported analysis type: {}",
            analysis_type
        )));
    }

    let export: AnalysisExport = serde_json::from_value(value)
        .map_err(|e| Error::Import(format!("malformed analysis export: {}", e)))?;
    Ok(ImportedAnalysis { export })
}

/// Read and parse an analysis export file.
pub fn read_analysis(path: &Path) -> Result<ImportedAnalysis> {
    let json = std::fs::read_to_string(path)?;
    parse_imported_analysis(&json)
}

// ============================================
// Record backup
// ============================================

/// Full copy of the roster and attendance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBackup {
    pub students: Roster,
    pub attendance: AttendanceHistory,
    pub backup_time: DateTime<Utc>,
}

/// Only used to tell a missing field apart from a malformed one.
#[derive(Deserialize)]
struct PartialBackup {
    students: Option<Roster>,
    attendance: Option<AttendanceHistory>,
    #[serde(rename = "backupTime")]
    backup_time: Option<DateTime<Utc>>,
}

impl RecordBackup {
    pub fn of(store: &RecordStore, now: DateTime<Utc>) -> Self {
        Self {
            students: store.students.clone(),
            attendance: store.attendance.clone(),
            backup_time: now,
        }
    }

    /// `attendance_backup_YYYY-MM-DD.json`
    pub fn default_file_name(date: NaiveDate) -> String {
        format!("attendance_backup_{}.json", date.format("%Y-%m-%d"))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Parse a backup; both `students` and `attendance` must be present.
    ///
    /// A missing `backupTime` is tolerated and reported as `None`.
    pub fn parse(json: &str) -> Result<(RecordStore, Option<DateTime<Utc>>)> {
        let partial: PartialBackup = serde_json::from_str(json)
            .map_err(|e| Error::Import(format!("malformed backup: {}", e)))?;

        match (partial.students, partial.attendance) {
            (Some(students), Some(attendance)) => Ok((
                RecordStore {
                    students,
                    attendance,
                },
                partial.backup_time,
            )),
            _ => Err(Error::Import(
                "backup must contain both students and attendance".to_string(),
            )),
        }
    }

    pub fn read(path: &Path) -> Result<(RecordStore, Option<DateTime<Utc>>)> {
        let json = std::fs::read_to_string(path)?;
        Self::parse(&json)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "Wrote export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatternType, StudentStatistic, Weekday};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn stat(id: u64, rate: u32, late: u32) -> StudentStatistic {
        StudentStatistic {
            id,
            name: format!("S{id}"),
            class: "A".to_string(),
            number: id as u32,
            total_days: 10,
            present_days: 0,
            late_days: late,
            absent_days: 0,
            attendance_rate: rate,
            late_count: late,
            absent_count: 0,
        }
    }

    fn result() -> AnalysisResult {
        let statistics = vec![stat(1, 100, 0), stat(2, 60, 4), stat(3, 95, 0)];
        let patterns = vec![DayPattern {
            day: Weekday::Friday,
            pattern_type: PatternType::Lateness,
            rate: 25,
            message: "Friday shows a high lateness rate (25%).".to_string(),
        }];
        AnalysisResult {
            generated_text: Some("Fridays need attention.".to_string()),
            local_analysis: LocalAnalysis::new(&statistics, patterns),
            statistics,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_export_carries_counts_and_metadata() {
        let export = AnalysisExport::from_result(&result(), now());
        assert_eq!(export.metadata.analysis_type, "attendance_analysis");
        assert_eq!(export.metadata.version, "1.0");
        assert_eq!(export.raw_data.student_count, 3);

        let stats = &export.raw_data.attendance_stats;
        assert_eq!(stats.average_attendance, Some(85));
        assert_eq!(stats.late_students, 1);
        assert_eq!(stats.absent_students, 1);
        assert_eq!(stats.patterns.len(), 1);
    }

    #[test]
    fn test_export_json_field_names() {
        let export = AnalysisExport::from_result(&result(), now());
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["metadata"]["analysisType"], "attendance_analysis");
        assert!(json["metadata"]["exportDate"].is_string());
        assert_eq!(json["aiResult"], "Fridays need attention.");
        assert!(json["localAnalysis"]["patternFound"].is_array());
        assert_eq!(json["rawData"]["studentCount"], 3);
        assert_eq!(json["rawData"]["attendanceStats"]["averageAttendance"], 85);
    }

    #[test]
    fn test_default_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert_eq!(
            AnalysisExport::default_file_name(date),
            "attendance_analysis_2024-03-08.json"
        );
        assert_eq!(
            RecordBackup::default_file_name(date),
            "attendance_backup_2024-03-08.json"
        );
    }

    #[test]
    fn test_import_accepts_own_export() {
        let export = AnalysisExport::from_result(&result(), now());
        let json = serde_json::to_string(&export).unwrap();
        let imported = parse_imported_analysis(&json).unwrap();
        assert_eq!(imported.ai_result(), Some("Fridays need attention."));
        assert_eq!(imported.local_analysis(), &export.local_analysis);
    }

    #[test]
    fn test_import_rejects_other_files() {
        let wrong_type = r#"{"metadata":{"exportDate":"2024-03-08T00:00:00Z","analysisType":"grades","version":"1.0"}}"#;
        assert!(matches!(
            parse_imported_analysis(wrong_type),
            Err(Error::Import(_))
        ));
        assert!(matches!(
            parse_imported_analysis(r#"{"students":{}}"#),
            Err(Error::Import(_))
        ));
        assert!(matches!(
            parse_imported_analysis("not json"),
            Err(Error::Import(_))
        ));
    }

    #[test]
    fn test_import_tolerates_missing_optional_sections() {
        let minimal = r#"{"metadata":{"exportDate":"2024-03-08T00:00:00Z","analysisType":"attendance_analysis","version":"1.0"}}"#;
        let imported = parse_imported_analysis(minimal).unwrap();
        assert!(imported.ai_result().is_none());
        assert!(imported.local_analysis().summary.is_empty());
    }

    #[test]
    fn test_backup_requires_both_sections() {
        assert!(matches!(
            RecordBackup::parse(r#"{"students":{}}"#),
            Err(Error::Import(_))
        ));
        assert!(matches!(
            RecordBackup::parse(r#"{"attendance":{}}"#),
            Err(Error::Import(_))
        ));
        let (store, time) = RecordBackup::parse(r#"{"students":{},"attendance":{}}"#).unwrap();
        assert!(store.students.is_empty());
        assert!(time.is_none());
    }

    #[test]
    fn test_backup_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("backups").join("b.json");

        let mut store = RecordStore::initial(&["A".to_string()], now().date_naive());
        store.add_student("A", 1, "Kim").unwrap();

        RecordBackup::of(&store, now()).write_to(&path).unwrap();
        let (restored, time) = RecordBackup::read(&path).unwrap();
        assert_eq!(restored, store);
        assert_eq!(time, Some(now()));
    }
}
