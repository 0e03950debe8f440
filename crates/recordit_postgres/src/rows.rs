//! sqlx row types and their conversions into core entities.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use recordit_core::roles::Role;
use recordit_core::types::*;

pub(crate) const COURSE_VIEW: &str = r#"
    SELECT c.id, c.teacher_id, c.name, c.grade, c.active, c.date, c.remark,
           t.name AS teacher_name, t.number AS teacher_number
    FROM courses c
    JOIN users t ON t.id = c.teacher_id
"#;

pub(crate) const REPORT_VIEW: &str = r#"
    SELECT r.id, r.course_id, r.reporter_id, r.name, r.score, r.active, r.date, r.remark,
           c.name AS course_name, c.active AS course_active, c.grade, c.teacher_id,
           t.name AS teacher_name, t.number AS teacher_number,
           u.name AS reporter_name, u.number AS reporter_number
    FROM reports r
    JOIN courses c ON c.id = r.course_id
    JOIN users t ON t.id = c.teacher_id
    JOIN users u ON u.id = r.reporter_id
"#;

pub(crate) const RECORD_VIEW: &str = r#"
    SELECT rt.id, rt.report_id, rt.user_id, rt.score, rt.time, rt.remark, rt.file,
           r.name AS report_name, (r.active AND c.active) AS report_active,
           r.course_id, c.teacher_id,
           v.name AS reviewer_name, v.number AS reviewer_number
    FROM record_tables rt
    JOIN reports r ON r.id = rt.report_id
    JOIN courses c ON c.id = r.course_id
    JOIN users v ON v.id = rt.user_id
"#;

pub(crate) const RECORD_EXPORT: &str = r#"
    SELECT rt.score, rt.time, rt.remark, rt.file, c.grade,
           c.name AS course_name, r.name AS report_name,
           u.name AS reporter_name, u.number AS reporter_number,
           v.name AS reviewer_name, v.number AS reviewer_number,
           t.name AS teacher_name, t.number AS teacher_number
    FROM record_tables rt
    JOIN reports r ON r.id = rt.report_id
    JOIN courses c ON c.id = r.course_id
    JOIN users u ON u.id = r.reporter_id
    JOIN users v ON v.id = rt.user_id
    JOIN users t ON t.id = c.teacher_id
"#;

pub(crate) const RECORD_COLUMNS: &str = "id, report_id, user_id, score, time, remark, file";

pub(crate) const USER_COLUMNS: &str = "id, number, name, password_hash, remark, locale, role";

#[derive(Debug, FromRow)]
pub(crate) struct PgUserRow {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub password_hash: String,
    pub remark: Option<String>,
    pub locale: String,
    pub role: String,
}

impl TryFrom<PgUserRow> for User {
    type Error = String;

    fn try_from(r: PgUserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&r.role).map_err(|_| format!("unknown role: {}", r.role))?;
        Ok(User {
            id: r.id,
            number: r.number,
            name: r.name,
            password_hash: r.password_hash,
            remark: r.remark,
            locale: r.locale,
            role,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgCourseViewRow {
    pub id: i64,
    pub teacher_id: i64,
    pub name: String,
    pub grade: i32,
    pub active: bool,
    pub date: NaiveDate,
    pub remark: Option<String>,
    pub teacher_name: String,
    pub teacher_number: String,
}

impl From<PgCourseViewRow> for CourseView {
    fn from(r: PgCourseViewRow) -> Self {
        CourseView {
            course: Course {
                id: r.id,
                teacher_id: r.teacher_id,
                name: r.name,
                grade: r.grade,
                active: r.active,
                date: r.date,
                remark: r.remark,
            },
            teacher_name: r.teacher_name,
            teacher_number: r.teacher_number,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgReportViewRow {
    pub id: i64,
    pub course_id: i64,
    pub reporter_id: i64,
    pub name: String,
    pub score: Option<i32>,
    pub active: bool,
    pub date: NaiveDate,
    pub remark: Option<String>,
    pub course_name: String,
    pub course_active: bool,
    pub grade: i32,
    pub teacher_id: i64,
    pub teacher_name: String,
    pub teacher_number: String,
    pub reporter_name: String,
    pub reporter_number: String,
}

impl From<PgReportViewRow> for ReportView {
    fn from(r: PgReportViewRow) -> Self {
        ReportView {
            report: Report {
                id: r.id,
                course_id: r.course_id,
                reporter_id: r.reporter_id,
                name: r.name,
                score: r.score,
                active: r.active,
                date: r.date,
                remark: r.remark,
            },
            course_name: r.course_name,
            course_active: r.course_active,
            grade: r.grade,
            teacher_id: r.teacher_id,
            teacher_name: r.teacher_name,
            teacher_number: r.teacher_number,
            reporter_name: r.reporter_name,
            reporter_number: r.reporter_number,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgRecordRow {
    pub id: i64,
    pub report_id: i64,
    pub user_id: i64,
    pub score: i32,
    pub time: DateTime<Utc>,
    pub remark: Option<String>,
    pub file: Option<String>,
}

impl From<PgRecordRow> for RecordTable {
    fn from(r: PgRecordRow) -> Self {
        RecordTable {
            id: r.id,
            report_id: r.report_id,
            user_id: r.user_id,
            score: r.score,
            time: r.time,
            remark: r.remark,
            file: r.file,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgRecordViewRow {
    #[sqlx(flatten)]
    pub record: PgRecordRow,
    pub report_name: String,
    pub report_active: bool,
    pub course_id: i64,
    pub teacher_id: i64,
    pub reviewer_name: String,
    pub reviewer_number: String,
}

impl From<PgRecordViewRow> for RecordView {
    fn from(r: PgRecordViewRow) -> Self {
        RecordView {
            record: r.record.into(),
            report_name: r.report_name,
            report_active: r.report_active,
            course_id: r.course_id,
            teacher_id: r.teacher_id,
            reviewer_name: r.reviewer_name,
            reviewer_number: r.reviewer_number,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgRecordExportRow {
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

impl From<PgRecordExportRow> for RecordExportRow {
    fn from(r: PgRecordExportRow) -> Self {
        RecordExportRow {
            score: r.score,
            time: r.time,
            remark: r.remark,
            file: r.file,
            grade: r.grade,
            course_name: r.course_name,
            report_name: r.report_name,
            reporter_name: r.reporter_name,
            reporter_number: r.reporter_number,
            reviewer_name: r.reviewer_name,
            reviewer_number: r.reviewer_number,
            teacher_name: r.teacher_name,
            teacher_number: r.teacher_number,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgLogRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub ip: Option<String>,
    pub time: DateTime<Utc>,
    pub content: String,
}

impl From<PgLogRow> for LogEntry {
    fn from(r: PgLogRow) -> Self {
        LogEntry {
            id: r.id,
            user_id: r.user_id,
            ip: r.ip,
            time: r.time,
            content: r.content,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PgLogExportRow {
    pub ip: Option<String>,
    pub time: DateTime<Utc>,
    pub content: String,
    pub number: Option<String>,
    pub role: Option<String>,
}

impl From<PgLogExportRow> for LogExportRow {
    fn from(r: PgLogExportRow) -> Self {
        LogExportRow {
            ip: r.ip,
            time: r.time,
            content: r.content,
            number: r.number,
            role: r.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_names_are_rejected() {
        let row = PgUserRow {
            id: 1,
            number: "007".into(),
            name: "Zero".into(),
            password_hash: String::new(),
            remark: None,
            locale: DEFAULT_LOCALE.into(),
            role: "Janitor".into(),
        };
        assert_eq!(User::try_from(row).unwrap_err(), "unknown role: Janitor");
    }

    #[test]
    fn record_view_flattens_record_columns() {
        let row = PgRecordViewRow {
            record: PgRecordRow {
                id: 3,
                report_id: 2,
                user_id: 1,
                score: 88,
                time: Utc::now(),
                remark: None,
                file: Some("a.png".into()),
            },
            report_name: "Week 1".into(),
            report_active: true,
            course_id: 9,
            teacher_id: 4,
            reviewer_name: "Li".into(),
            reviewer_number: "201600000001".into(),
        };
        let view = RecordView::from(row);
        assert_eq!(view.record.score, 88);
        assert_eq!(view.record.file.as_deref(), Some("a.png"));
        assert_eq!(view.teacher_id, 4);
    }
}
