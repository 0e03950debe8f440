//! /admin/manage/course/*: course management.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use recordit_core::pagination::{Page, PageQuery};
use recordit_core::principal::Principal;
use recordit_core::service::{CourseForm, RecordService};
use recordit_core::types::CourseView;
use serde_json::{json, Value};

use crate::error::AppError;

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<CourseView>>, AppError> {
    Ok(Json(service.list_courses(&principal, q.page).await?))
}

pub async fn switch_state(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(id): Path<i64>,
) -> Result<Json<CourseView>, AppError> {
    Ok(Json(service.switch_course_state(&principal, id).await?))
}

/// Choices for the add form.
pub async fn add_form(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
) -> Result<Json<Value>, AppError> {
    let grades = service.course_grades(&principal).await?;
    Ok(Json(json!({ "grades": grades })))
}

pub async fn add(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Json(form): Json<CourseForm>,
) -> Result<Json<CourseView>, AppError> {
    Ok(Json(service.add_course(&principal, form).await?))
}
