use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;

use recordit_core::error::RecordError;
use recordit_core::ports::{ReportStore, Result};
use recordit_core::types::*;

use crate::rows::{PgReportViewRow, REPORT_VIEW};
use crate::{db_error, not_found};

/// `scope` as nullable filters: teacher id, grade, excluded reporter.
fn scope_binds(scope: &ReportScope) -> (Option<i64>, Option<i32>, Option<i64>) {
    match scope {
        ReportScope::All => (None, None, None),
        ReportScope::Teacher(teacher_id) => (Some(*teacher_id), None, None),
        ReportScope::Student { grade, reporter_id } => (None, Some(*grade), Some(*reporter_id)),
    }
}

const VISIBLE_FILTER: &str = r#"
    WHERE r.active AND c.active
      AND ($1::bigint IS NULL OR c.teacher_id = $1)
      AND ($2::int IS NULL OR c.grade = $2)
      AND ($3::bigint IS NULL OR r.reporter_id <> $3)
"#;

// ── PgReportStore ─────────────────────────────────────────────

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn get_report(&self, id: i64) -> Result<Option<ReportView>> {
        let row = sqlx::query_as::<_, PgReportViewRow>(&format!("{REPORT_VIEW} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn insert_report(&self, report: NewReport) -> Result<ReportView> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reports (course_id, reporter_id, name, remark)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(report.course_id)
        .bind(report.reporter_id)
        .bind(&report.name)
        .bind(&report.remark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, &format!("course {}", report.course_id)))?;
        self.get_report(id)
            .await?
            .ok_or_else(|| RecordError::Internal(anyhow!("report {id} vanished after insert")))
    }

    async fn list_course_reports(&self, course_id: i64, limit: i64, offset: i64) -> Result<Vec<ReportView>> {
        let rows = sqlx::query_as::<_, PgReportViewRow>(&format!(
            r#"
            {REPORT_VIEW}
            WHERE r.course_id = $1
            ORDER BY r.date DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(course_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_course_reports(&self, course_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    async fn list_visible_reports(
        &self,
        scope: &ReportScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportView>> {
        let (teacher_id, grade, exclude_reporter) = scope_binds(scope);
        let rows = sqlx::query_as::<_, PgReportViewRow>(&format!(
            r#"
            {REPORT_VIEW}
            {VISIBLE_FILTER}
            ORDER BY r.date ASC, r.id ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(teacher_id)
        .bind(grade)
        .bind(exclude_reporter)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_visible_reports(&self, scope: &ReportScope) -> Result<i64> {
        let (teacher_id, grade, exclude_reporter) = scope_binds(scope);
        let count: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*)
            FROM reports r
            JOIN courses c ON c.id = r.course_id
            {VISIBLE_FILTER}
            "#
        ))
        .bind(teacher_id)
        .bind(grade)
        .bind(exclude_reporter)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    async fn set_report_active(&self, id: i64, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE reports SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("report", id));
        }
        Ok(())
    }

    async fn delete_report(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("report", id));
        }
        Ok(())
    }

    async fn count_reports(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_binds_match_filter_placeholders() {
        assert_eq!(scope_binds(&ReportScope::All), (None, None, None));
        assert_eq!(scope_binds(&ReportScope::Teacher(4)), (Some(4), None, None));
        assert_eq!(
            scope_binds(&ReportScope::Student {
                grade: 2016,
                reporter_id: 9
            }),
            (None, Some(2016), Some(9))
        );
    }
}
