use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;

use recordit_core::ports::{AuditStore, Result};
use recordit_core::types::*;

use crate::rows::{PgLogExportRow, PgLogRow};

// ── PgAuditStore ──────────────────────────────────────────────

/// Append-only audit log.
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry> {
        let row = sqlx::query_as::<_, PgLogRow>(
            r#"
            INSERT INTO logs (user_id, ip, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, ip, time, content
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.ip)
        .bind(&entry.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn count_logs(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    async fn export_logs(&self) -> Result<Vec<LogExportRow>> {
        let rows = sqlx::query_as::<_, PgLogExportRow>(
            r#"
            SELECT l.ip, l.time, l.content, u.number, u.role
            FROM logs l
            LEFT JOIN users u ON u.id = l.user_id
            ORDER BY l.time ASC, l.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
