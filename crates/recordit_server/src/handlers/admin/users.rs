//! /admin/manage/user/*: user management.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    Json,
};
use recordit_core::error::RecordError;
use recordit_core::pagination::Page;
use recordit_core::principal::Principal;
use recordit_core::roles::{Role, UserFilter};
use recordit_core::service::{PasswordForm, ProfileForm, RecordService, RegisterForm};
use recordit_core::types::{BatchOutcome, User};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub filter: UserFilter,
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

/// `student`, `Teacher`, ... as a role.
fn parse_role(raw: &str) -> Result<Role, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "student" => Ok(Role::Student),
        "teacher" => Ok(Role::Teacher),
        "administrator" => Ok(Role::Administrator),
        _ => Err(RecordError::NotFound(format!("role {raw}")).into()),
    }
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Query(q): Query<UserListQuery>,
) -> Result<Json<Page<User>>, AppError> {
    Ok(Json(service.list_users(&principal, q.filter, q.page).await?))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    service.delete_user(&principal, id).await?;
    Ok(Json(json!({ "message": "The user has been deleted." })))
}

pub async fn get_profile(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service.get_profile(&principal, id).await?))
}

pub async fn edit_profile(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service.edit_profile(&principal, id, form).await?))
}

pub async fn change_password(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
    Json(form): Json<PasswordForm>,
) -> Result<Json<Value>, AppError> {
    service.reset_password(&principal, id, form).await?;
    Ok(Json(json!({ "message": "The password has been updated." })))
}

pub async fn register(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(role): Path<String>,
    Json(form): Json<RegisterForm>,
) -> Result<Json<User>, AppError> {
    let role = parse_role(&role)?;
    Ok(Json(service.register_user(&principal, role, form).await?))
}

/// Body: a user sheet as CSV.
pub async fn register_batch(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    body: Bytes,
) -> Result<Json<BatchOutcome>, AppError> {
    Ok(Json(service.register_batch(&principal, &body).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_segment_is_case_insensitive() {
        assert_eq!(parse_role("Teacher").unwrap(), Role::Teacher);
        assert_eq!(parse_role("student").unwrap(), Role::Student);
        assert!(parse_role("janitor").is_err());
    }
}
