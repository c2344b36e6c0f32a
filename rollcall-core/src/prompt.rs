//! Prompt construction for the text-generation service.
//!
//! Pure string building; nothing here talks to the network.

use crate::analytics::statistics::rounded_mean_rate;
use crate::analytics::summary::{LocalAnalysis, LOW_ATTENDANCE_RATE};
use crate::export::AnalysisExport;
use crate::types::StudentStatistic;

/// Rate below which a student is included in the risk prompt.
pub const RISK_RATE: u32 = 85;
/// Late count at or above which a student is included in the risk prompt.
pub const RISK_LATE_COUNT: u32 = 3;
/// Absence count at or above which a student is included in the risk prompt.
pub const RISK_ABSENT_COUNT: u32 = 2;

const NO_LOW_ATTENDANCE: &str = "None found.";
const NO_PATTERNS: &str = "No clear weekday pattern found.";
const NO_RISK_STUDENTS: &str = "No at-risk students found.";
const NOT_AVAILABLE: &str = "Not available";

/// What the model is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Interpret weekday patterns and low attendance
    AttendancePatterns,
    /// Review at-risk students individually
    StudentRisk,
    /// Class-wide improvement plan
    ImprovementSuggestions,
    /// Caller-supplied instruction, sent verbatim
    Custom(String),
}

impl AnalysisKind {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisKind::AttendancePatterns => "attendance-patterns",
            AnalysisKind::StudentRisk => "student-risk",
            AnalysisKind::ImprovementSuggestions => "improvement-suggestions",
            AnalysisKind::Custom(_) => "custom",
        }
    }
}

impl std::str::FromStr for AnalysisKind {
    type Err = String;

    /// Parses the built-in kinds only; custom instructions are constructed directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance-patterns" => Ok(AnalysisKind::AttendancePatterns),
            "student-risk" => Ok(AnalysisKind::StudentRisk),
            "improvement-suggestions" => Ok(AnalysisKind::ImprovementSuggestions),
            _ => Err(format!(
                "unknown analysis kind: {} (expected attendance-patterns, student-risk or improvement-suggestions)",
                s
            )),
        }
    }
}

/// Build the instruction text for `kind`.
pub fn build_prompt(
    kind: &AnalysisKind,
    stats: &[StudentStatistic],
    local: &LocalAnalysis,
) -> String {
    match kind {
        AnalysisKind::AttendancePatterns => attendance_patterns_prompt(local),
        AnalysisKind::StudentRisk => student_risk_prompt(stats, local),
        AnalysisKind::ImprovementSuggestions => improvement_suggestions_prompt(stats, local),
        AnalysisKind::Custom(instruction) => instruction.clone(),
    }
}

/// Students matching any one of the risk conditions, in statistics order.
pub fn risk_students(stats: &[StudentStatistic]) -> Vec<&StudentStatistic> {
    stats
        .iter()
        .filter(|s| {
            s.attendance_rate < RISK_RATE
                || s.late_count >= RISK_LATE_COUNT
                || s.absent_count >= RISK_ABSENT_COUNT
        })
        .collect()
}

fn pattern_lines(local: &LocalAnalysis) -> String {
    if local.patterns.is_empty() {
        return NO_PATTERNS.to_string();
    }
    local
        .patterns
        .iter()
        .map(|p| p.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn attendance_patterns_prompt(local: &LocalAnalysis) -> String {
    let low = if local.worst_attendance.is_empty() {
        NO_LOW_ATTENDANCE.to_string()
    } else {
        local
            .worst_attendance
            .iter()
            .map(|s| {
                format!(
                    "Student: {}, attendance rate: {}%, late: {}, absent: {}",
                    s.name, s.attendance_rate, s.late_count, s.absent_count
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an expert in analyzing classroom attendance data. Based on the data below, \
analyze the attendance patterns and provide insightful interpretation.

[Students with low attendance]
{low}

[Weekday patterns]
{patterns}

[Overall summary]
{summary}

Please answer the following:
1. What attendance patterns do you see?
2. What are the likely causes of these patterns?
3. What concrete steps would improve attendance?

Keep the analysis clear and specific.",
        patterns = pattern_lines(local),
        summary = local.summary,
    )
}

fn student_risk_prompt(stats: &[StudentStatistic], local: &LocalAnalysis) -> String {
    let at_risk = risk_students(stats);
    let records = if at_risk.is_empty() {
        NO_RISK_STUDENTS.to_string()
    } else {
        at_risk
            .iter()
            .map(|s| {
                format!(
                    "Student: {}\nClass/number: class {} no. {}\nAttendance rate: {}%\nLate: {}\nAbsent: {}\nRecorded days: {}",
                    s.name,
                    s.class,
                    s.number,
                    s.attendance_rate,
                    s.late_count,
                    s.absent_count,
                    s.total_days
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n")
    };

    format!(
        "You are an education counselor who identifies academically at-risk students from \
attendance data. Analyze the students below and propose intervention strategies.

[At-risk student data]
{records}

[Overall summary]
{summary}

Please answer the following:
1. A detailed analysis of each at-risk student, highest risk first
2. Tailored support strategies for each student
3. Concrete actions for teachers and parents
4. How these attendance problems may affect academic achievement

Keep the advice practical and suited to a school setting.",
        summary = local.summary,
    )
}

fn improvement_suggestions_prompt(stats: &[StudentStatistic], local: &LocalAnalysis) -> String {
    let total = stats.len();
    let average = rounded_mean_rate(stats)
        .map(|rate| format!("{rate}%"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let perfect = stats.iter().filter(|s| s.attendance_rate == 100).count();
    let low = stats
        .iter()
        .filter(|s| s.attendance_rate < LOW_ATTENDANCE_RATE)
        .count();

    format!(
        "You are an expert in school attendance management and improvement planning. Based on \
the data below, propose concrete strategies and an action plan to improve class attendance.

[Attendance statistics]
- Total students: {total}
- Average attendance rate: {average}
- Students with perfect attendance: {perfect}
- Students below {threshold}% attendance: {low}

[Weekday patterns]
{patterns}

[Overall summary]
{summary}

Please propose concrete strategies for:
1. Raising overall attendance at the class level
2. Reducing late arrivals
3. Addressing weekday-specific absence or lateness
4. Strengthening cooperation with parents
5. Building effective attendance monitoring and early intervention

Keep the proposals practical, specific, and actionable.",
        threshold = LOW_ATTENDANCE_RATE,
        patterns = pattern_lines(local),
        summary = local.summary,
    )
}

/// Follow-up review prompt for a previously exported analysis.
pub fn build_export_review_prompt(export: &AnalysisExport) -> String {
    let local = &export.local_analysis;

    let student_summary = if local.worst_attendance.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        format!(
            "{} students with the lowest attendance",
            local.worst_attendance.len()
        )
    };
    let pattern_summary = if local.patterns.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        local
            .patterns
            .iter()
            .map(|p| p.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    };
    let summary = if local.summary.is_empty() {
        NOT_AVAILABLE
    } else {
        local.summary.as_str()
    };
    let ai_result = export.ai_result.as_deref().unwrap_or(NOT_AVAILABLE);

    format!(
        "You are an education data analyst. Review the exported attendance analysis below and \
provide deeper insight and improvement ideas.

Export metadata:
- Exported at: {exported_at}
- Analysis type: {analysis_type}
- Version: {version}

Data summary:
- Students: {students}
- Student highlights: {student_summary}
- Patterns: {pattern_summary}
- Summary: {summary}

Previous AI analysis:
{ai_result}

Please go deeper on:
1. Additional insights in the attendance patterns
2. Students who need particular attention, and why
3. How these patterns may affect academic achievement
4. Five concrete, actionable improvement strategies
5. Further steps for teachers or school administrators
",
        exported_at = export.metadata.export_date.to_rfc3339(),
        analysis_type = export.metadata.analysis_type,
        version = export.metadata.version,
        students = export.raw_data.student_count,
    )
}
