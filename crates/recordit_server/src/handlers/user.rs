//! /user/*: report feed, reviews, attachments and own settings.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    Json,
};
use recordit_core::pagination::PageQuery;
use recordit_core::principal::Principal;
use recordit_core::service::{Feed, RecordService, ReviewForm, ReviewPage, SettingsForm};
use recordit_core::types::{RecordTable, User};
use recordit_core::validation::field_error;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub password: String,
    pub password2: String,
}

pub async fn feed(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Feed>, AppError> {
    Ok(Json(service.feed(&principal, q.page).await?))
}

pub async fn get_review(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
) -> Result<Json<ReviewPage>, AppError> {
    Ok(Json(service.get_review(&principal, id).await?))
}

pub async fn review(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<RecordTable>, AppError> {
    Ok(Json(service.review(&principal, id, form).await?))
}

/// The raw request body is the file; `?filename=` carries its name.
pub async fn upload(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<RecordTable>, AppError> {
    let filename = q
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| field_error("File", "This field is required"))?;
    if body.is_empty() {
        return Err(field_error("File", "The file is empty").into());
    }
    Ok(Json(
        service
            .upload_attachment(&principal, id, &filename, &body)
            .await?,
    ))
}

pub async fn profile(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service.profile(&principal).await?))
}

pub async fn edit_profile(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Json(form): Json<SettingsForm>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service.edit_settings(&principal, form).await?))
}

pub async fn change_password(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    service
        .change_password(&principal, &req.old_password, &req.password, &req.password2)
        .await?;
    Ok(Json(json!({ "message": "Your password has been updated." })))
}
