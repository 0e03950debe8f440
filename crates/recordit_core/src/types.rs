//! Entity types shared by the service, the stores and the HTTP layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::roles::Role;

pub const DEFAULT_LOCALE: &str = "zh_Hans_CN";

// ── Users ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub number: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub remark: Option<String>,
    pub locale: String,
    pub role: Role,
}

impl User {
    pub fn username(&self) -> &str {
        &self.number
    }

    pub fn whoami(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.whoami(Role::Administrator)
    }

    pub fn is_teacher(&self) -> bool {
        self.whoami(Role::Teacher)
    }

    pub fn is_student(&self) -> bool {
        self.whoami(Role::Student)
    }

    /// Enrolment year, read off the first four digits of a student number.
    pub fn grade(&self) -> Option<i32> {
        if !self.is_student() {
            return None;
        }
        self.number.get(..4).and_then(|g| g.parse().ok())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub number: String,
    pub name: String,
    pub password_hash: String,
    pub remark: Option<String>,
    pub role: Role,
}

// ── Courses ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: i64,
    pub teacher_id: i64,
    pub name: String,
    pub grade: i32,
    pub active: bool,
    pub date: NaiveDate,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    pub teacher_name: String,
    pub teacher_number: String,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub teacher_id: i64,
    pub name: String,
    pub grade: i32,
    pub remark: Option<String>,
}

// ── Reports ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: i64,
    pub course_id: i64,
    pub reporter_id: i64,
    pub name: String,
    pub score: Option<i32>,
    pub active: bool,
    pub date: NaiveDate,
    pub remark: Option<String>,
}

/// A report joined with its course, teacher and reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub course_name: String,
    pub course_active: bool,
    pub grade: i32,
    pub teacher_id: i64,
    pub teacher_name: String,
    pub teacher_number: String,
    pub reporter_name: String,
    pub reporter_number: String,
}

impl ReportView {
    /// A report is live only while both it and its course are active.
    pub fn is_active(&self) -> bool {
        self.course_active && self.report.active
    }
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub course_id: i64,
    pub reporter_id: i64,
    pub name: String,
    pub remark: Option<String>,
}

/// Which reports a user-area feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Teacher(i64),
    Student { grade: i32, reporter_id: i64 },
}

// ── Record tables (reviews) ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTable {
    pub id: i64,
    pub report_id: i64,
    pub user_id: i64,
    pub score: i32,
    pub time: DateTime<Utc>,
    pub remark: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: RecordTable,
    pub report_name: String,
    pub report_active: bool,
    pub course_id: i64,
    pub teacher_id: i64,
    pub reviewer_name: String,
    pub reviewer_number: String,
}

/// One spreadsheet row of a record export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordExportRow {
    pub score: i32,
    pub time: DateTime<Utc>,
    pub remark: Option<String>,
    pub file: Option<String>,
    pub grade: i32,
    pub course_name: String,
    pub report_name: String,
    pub reporter_name: String,
    pub reporter_number: String,
    pub reviewer_name: String,
    pub reviewer_number: String,
    pub teacher_name: String,
    pub teacher_number: String,
}

// ── Audit log ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub ip: Option<String>,
    pub time: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub user_id: i64,
    pub ip: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogExportRow {
    pub ip: Option<String>,
    pub time: DateTime<Utc>,
    pub content: String,
    pub number: Option<String>,
    pub role: Option<String>,
}

// ── Read models ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub user_count: i64,
    pub admin_count: i64,
    pub teacher_count: i64,
    pub student_count: i64,
    pub course_count: i64,
    pub log_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AboutCounts {
    pub teacher_count: i64,
    pub student_count: i64,
    pub course_count: i64,
    pub report_count: i64,
}

/// Per-row result of a spreadsheet import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub created: Vec<String>,
    pub errors: Vec<String>,
}
