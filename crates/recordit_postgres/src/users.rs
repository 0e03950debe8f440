use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use strum::IntoEnumIterator;

use recordit_core::error::RecordError;
use recordit_core::ports::{Result, UserStore};
use recordit_core::roles::{Permission, Role};
use recordit_core::types::*;

use crate::rows::{PgUserRow, USER_COLUMNS};
use crate::{db_error, not_found};

// ── PgUserStore ───────────────────────────────────────────────

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_user(row: PgUserRow) -> Result<User> {
    row.try_into().map_err(|e: String| RecordError::Internal(anyhow!(e)))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, PgUserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(into_user).transpose()
    }

    async fn find_user_by_number(&self, number: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, PgUserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(into_user).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, PgUserRow>(&format!(
            r#"
            INSERT INTO users (number, name, password_hash, remark, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.number)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.remark)
        .bind(user.role.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, &user.number))?;
        into_user(row)
    }

    async fn update_user_profile(
        &self,
        id: i64,
        number: &str,
        name: &str,
        remark: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET number = $2, name = $3, remark = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(number)
        .bind(name)
        .bind(remark)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, number))?;
        if result.rows_affected() == 0 {
            return Err(not_found("user", id));
        }
        Ok(())
    }

    async fn update_user_settings(&self, id: i64, remark: Option<&str>, locale: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET remark = $2, locale = $3 WHERE id = $1")
            .bind(id)
            .bind(remark)
            .bind(locale)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("user", id));
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("user", id));
        }
        Ok(())
    }

    /// Foreign keys cascade to courses, reports and reviews and detach
    /// log rows.
    async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("user", id));
        }
        Ok(())
    }

    async fn count_users(&self, role: Option<Role>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)",
        )
        .bind(role.map(|r| r.as_ref().to_string()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(count)
    }

    async fn list_users(&self, role: Option<Role>, limit: i64, offset: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, PgUserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY number DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role.map(|r| r.as_ref().to_string()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        rows.into_iter().map(into_user).collect()
    }

    async fn student_grades(&self) -> Result<Vec<i32>> {
        let grades: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT CAST(SUBSTRING(number FROM 1 FOR 4) AS INTEGER) AS grade
            FROM users
            WHERE role = 'Student' AND number ~ '^[0-9]{4}'
            ORDER BY grade
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(grades)
    }

    async fn sync_role_permissions(&self, grants: &[(Role, &'static [Permission])]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        for permission in Permission::iter() {
            sqlx::query("INSERT INTO permissions (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(permission.as_ref())
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;
        }

        for (role, permissions) in grants {
            sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(role.as_ref())
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;
            sqlx::query(
                r#"
                DELETE FROM roles_permissions
                WHERE role_id = (SELECT id FROM roles WHERE name = $1)
                "#,
            )
            .bind(role.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;

            let names: Vec<String> = permissions.iter().map(|p| p.as_ref().to_string()).collect();
            sqlx::query(
                r#"
                INSERT INTO roles_permissions (role_id, permission_id)
                SELECT r.id, p.id
                FROM roles r, permissions p
                WHERE r.name = $1 AND p.name = ANY($2)
                "#,
            )
            .bind(role.as_ref())
            .bind(&names)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        }

        tx.commit().await.map_err(|e| anyhow!(e))?;
        tracing::info!(roles = grants.len(), "role permissions synced");
        Ok(())
    }

    async fn role_permissions(&self, role: Role) -> Result<Vec<Permission>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT p.name
            FROM permissions p
            JOIN roles_permissions rp ON rp.permission_id = p.id
            JOIN roles r ON r.id = rp.role_id
            WHERE r.name = $1
            ORDER BY p.id
            "#,
        )
        .bind(role.as_ref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        names
            .iter()
            .map(|n| {
                n.parse::<Permission>()
                    .map_err(|_| RecordError::Internal(anyhow!("unknown permission: {n}")))
            })
            .collect()
    }
}
