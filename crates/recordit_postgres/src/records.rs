use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;

use recordit_core::ports::{RecordStore, Result};
use recordit_core::types::*;

use crate::rows::{
    PgRecordExportRow, PgRecordRow, PgRecordViewRow, RECORD_COLUMNS, RECORD_EXPORT, RECORD_VIEW,
};
use crate::{db_error, not_found};

// ── PgRecordStore ─────────────────────────────────────────────

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get_record(&self, id: i64) -> Result<Option<RecordView>> {
        let row = sqlx::query_as::<_, PgRecordViewRow>(&format!("{RECORD_VIEW} WHERE rt.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn find_record(&self, report_id: i64, user_id: i64) -> Result<Option<RecordTable>> {
        let row = sqlx::query_as::<_, PgRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM record_tables WHERE report_id = $1 AND user_id = $2"
        ))
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn find_record_by_file(&self, file: &str) -> Result<Option<RecordView>> {
        let row = sqlx::query_as::<_, PgRecordViewRow>(&format!("{RECORD_VIEW} WHERE rt.file = $1"))
            .bind(file)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn upsert_record(
        &self,
        report_id: i64,
        user_id: i64,
        score: i32,
        remark: Option<&str>,
    ) -> Result<RecordTable> {
        let row = sqlx::query_as::<_, PgRecordRow>(&format!(
            r#"
            INSERT INTO record_tables (report_id, user_id, score, remark, time)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (report_id, user_id)
            DO UPDATE SET score = EXCLUDED.score, remark = EXCLUDED.remark, time = now()
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(user_id)
        .bind(score)
        .bind(remark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, &format!("report {report_id}")))?;
        Ok(row.into())
    }

    async fn set_record_file(&self, id: i64, file: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE record_tables SET file = $2 WHERE id = $1")
            .bind(id)
            .bind(file)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("record", id));
        }
        Ok(())
    }

    async fn delete_record(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM record_tables WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("record", id));
        }
        Ok(())
    }

    async fn list_report_records(&self, report_id: i64, limit: i64, offset: i64) -> Result<Vec<RecordView>> {
        let rows = sqlx::query_as::<_, PgRecordViewRow>(&format!(
            r#"
            {RECORD_VIEW}
            WHERE rt.report_id = $1
            ORDER BY rt.time DESC, rt.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(report_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_report_records(&self, report_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM record_tables WHERE report_id = $1")
                .bind(report_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    async fn export_report_records(&self, report_id: i64) -> Result<Vec<RecordExportRow>> {
        let rows = sqlx::query_as::<_, PgRecordExportRow>(&format!(
            "{RECORD_EXPORT} WHERE rt.report_id = $1 ORDER BY rt.id"
        ))
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn export_course_records(&self, course_id: i64) -> Result<Vec<RecordExportRow>> {
        let rows = sqlx::query_as::<_, PgRecordExportRow>(&format!(
            "{RECORD_EXPORT} WHERE r.course_id = $1 ORDER BY r.id, rt.id"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn user_attachment_files(&self, user_id: i64) -> Result<Vec<String>> {
        let files = sqlx::query_scalar::<_, String>(
            r#"
            SELECT rt.file
            FROM record_tables rt
            JOIN reports r ON r.id = rt.report_id
            JOIN courses c ON c.id = r.course_id
            WHERE rt.file IS NOT NULL
              AND (rt.user_id = $1 OR r.reporter_id = $1 OR c.teacher_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(files)
    }
}
