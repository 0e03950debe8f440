//! Postgres implementations of all recordit_core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid compile-time DB requirement.

use std::sync::Arc;

use anyhow::anyhow;
use sqlx::PgPool;

use recordit_core::error::RecordError;
use recordit_core::ports::{Result, Stores};

mod audit;
mod courses;
mod records;
mod reports;
mod rows;
mod users;

pub use audit::PgAuditStore;
pub use courses::PgCourseStore;
pub use records::PgRecordStore;
pub use reports::PgReportStore;
pub use users::PgUserStore;

pub const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

const DROP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS logs, record_tables, reports, courses, users,
    roles_permissions, permissions, roles CASCADE
"#;

/// One adapter per port, all sharing a pool.
pub struct PgStores {
    pub users: PgUserStore,
    pub courses: PgCourseStore,
    pub reports: PgReportStore,
    pub records: PgRecordStore,
    pub audit: PgAuditStore,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: PgUserStore::new(pool.clone()),
            courses: PgCourseStore::new(pool.clone()),
            reports: PgReportStore::new(pool.clone()),
            records: PgRecordStore::new(pool.clone()),
            audit: PgAuditStore::new(pool),
        }
    }

    pub fn into_stores(self) -> Stores {
        Stores {
            users: Arc::new(self.users),
            courses: Arc::new(self.courses),
            reports: Arc::new(self.reports),
            records: Arc::new(self.records),
            audit: Arc::new(self.audit),
        }
    }
}

/// Create every table that does not exist yet.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| anyhow!(e))?;
    tracing::info!("schema created");
    Ok(())
}

pub async fn drop_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(DROP_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| anyhow!(e))?;
    tracing::warn!("schema dropped");
    Ok(())
}

/// Map constraint violations onto domain errors; everything else is
/// internal.
pub(crate) fn db_error(e: sqlx::Error, what: &str) -> RecordError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return RecordError::Conflict(format!("{what} is already existed."));
        }
        if db.is_foreign_key_violation() {
            return RecordError::NotFound(what.to_string());
        }
    }
    RecordError::Internal(anyhow!(e))
}

pub(crate) fn not_found(what: &str, id: i64) -> RecordError {
    RecordError::NotFound(format!("{what} {id}"))
}
