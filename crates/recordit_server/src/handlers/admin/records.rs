//! /admin/manage/record-table/*: reviews of a report.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::Response,
    Json,
};
use recordit_core::pagination::{Page, PageQuery};
use recordit_core::principal::Principal;
use recordit_core::service::RecordService;
use recordit_core::types::RecordView;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::handlers::download_response;

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(report_id): Path<i64>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<RecordView>>, AppError> {
    Ok(Json(service.list_records(&principal, report_id, q.page).await?))
}

pub async fn download(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(report_id): Path<i64>,
) -> Result<Response, AppError> {
    let download = service.download_report_records(&principal, report_id).await?;
    Ok(download_response(download))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(record_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    service.delete_record(&principal, record_id).await?;
    Ok(Json(json!({ "message": "The record has been deleted." })))
}

pub async fn attachment(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let download = service.download_attachment(&principal, &file).await?;
    Ok(download_response(download))
}
