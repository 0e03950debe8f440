//! /admin/*: staff area. Every route sits behind `require_staff`.

pub mod courses;
pub mod logs;
pub mod records;
pub mod reports;
pub mod users;

use std::sync::Arc;

use axum::{extract::Extension, Json};
use recordit_core::principal::Principal;
use recordit_core::service::RecordService;
use recordit_core::types::DashboardCounts;

use crate::error::AppError;

pub async fn dashboard(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
) -> Result<Json<DashboardCounts>, AppError> {
    Ok(Json(service.dashboard(&principal).await?))
}
