//! Public pages: health, index, about.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use recordit_core::service::RecordService;
use recordit_core::types::AboutCounts;
use serde_json::{json, Value};

use crate::error::AppError;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to recordit.",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn about(
    Extension(service): Extension<Arc<RecordService>>,
) -> Result<Json<AboutCounts>, AppError> {
    Ok(Json(service.about().await?))
}
