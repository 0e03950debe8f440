//! /admin/manage/report/:id/*: reports of a course.
//!
//! `:id` is the course for listing, adding and downloading, and the report
//! for switching and deleting.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    response::Response,
    Json,
};
use recordit_core::pagination::{Page, PageQuery};
use recordit_core::principal::Principal;
use recordit_core::service::{RecordService, ReportForm};
use recordit_core::types::{BatchOutcome, ReportView};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::handlers::download_response;

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(course_id): Path<i64>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<ReportView>>, AppError> {
    Ok(Json(service.list_reports(&principal, course_id, q.page).await?))
}

pub async fn download(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(course_id): Path<i64>,
) -> Result<Response, AppError> {
    let download = service.download_course_records(&principal, course_id).await?;
    Ok(download_response(download))
}

pub async fn switch_state(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(report_id): Path<i64>,
) -> Result<Json<ReportView>, AppError> {
    Ok(Json(service.switch_report_state(&principal, report_id).await?))
}

pub async fn add(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(course_id): Path<i64>,
    Json(form): Json<ReportForm>,
) -> Result<Json<ReportView>, AppError> {
    Ok(Json(service.add_report(&principal, course_id, form).await?))
}

/// Body: a report sheet as CSV.
pub async fn batch(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(course_id): Path<i64>,
    body: Bytes,
) -> Result<Json<BatchOutcome>, AppError> {
    Ok(Json(
        service
            .add_report_batch(&principal, course_id, &body)
            .await?,
    ))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(report_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    service.delete_report(&principal, report_id).await?;
    Ok(Json(json!({ "message": "The report has been deleted." })))
}
