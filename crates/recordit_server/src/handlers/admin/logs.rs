//! /admin/manage/logs/*: log downloads.

use std::sync::Arc;

use axum::{extract::Extension, response::Response};
use recordit_core::principal::Principal;
use recordit_core::service::RecordService;

use crate::error::AppError;
use crate::handlers::download_response;

pub async fn system(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
) -> Result<Response, AppError> {
    Ok(download_response(service.system_logs(&principal).await?))
}

pub async fn user(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
) -> Result<Response, AppError> {
    Ok(download_response(service.user_logs(&principal).await?))
}
