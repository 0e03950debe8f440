use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;

use recordit_core::error::RecordError;
use recordit_core::ports::{CourseStore, Result};
use recordit_core::types::*;

use crate::rows::{PgCourseViewRow, COURSE_VIEW};
use crate::{db_error, not_found};

// ── PgCourseStore ─────────────────────────────────────────────

pub struct PgCourseStore {
    pool: PgPool,
}

impl PgCourseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseStore for PgCourseStore {
    async fn get_course(&self, id: i64) -> Result<Option<CourseView>> {
        let row = sqlx::query_as::<_, PgCourseViewRow>(&format!("{COURSE_VIEW} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn insert_course(&self, course: NewCourse) -> Result<CourseView> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO courses (teacher_id, name, grade, remark)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(course.teacher_id)
        .bind(&course.name)
        .bind(course.grade)
        .bind(&course.remark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, &format!("user {}", course.teacher_id)))?;
        self.get_course(id)
            .await?
            .ok_or_else(|| RecordError::Internal(anyhow!("course {id} vanished after insert")))
    }

    async fn list_courses(
        &self,
        teacher_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CourseView>> {
        let rows = sqlx::query_as::<_, PgCourseViewRow>(&format!(
            r#"
            {COURSE_VIEW}
            WHERE ($1::bigint IS NULL OR c.teacher_id = $1)
            ORDER BY c.date DESC, c.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(teacher_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_courses(&self, teacher_id: Option<i64>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM courses WHERE ($1::bigint IS NULL OR teacher_id = $1)",
        )
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    async fn set_course_active(&self, id: i64, active: bool) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        let result = sqlx::query("UPDATE courses SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("course", id));
        }

        let reports = sqlx::query("UPDATE reports SET active = $2 WHERE course_id = $1")
            .bind(id)
            .bind(active)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?
            .rows_affected();

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(reports)
    }
}
