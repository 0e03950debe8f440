//! POST /auth/*: token issue.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use recordit_core::principal::Principal;
use recordit_core::service::RecordService;
use recordit_core::types::User;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::middleware::jwt::JwtConfig;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReAuthRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Seconds until `token` expires.
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_token: Option<String>,
    pub user: User,
}

pub async fn login(
    Extension(service): Extension<Arc<RecordService>>,
    Extension(jwt): Extension<JwtConfig>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = service.authenticate(&req.username, &req.password).await?;
    let remember_token = if req.remember_me {
        Some(jwt.remember_token(user.id)?)
    } else {
        None
    };
    tracing::info!(number = %user.number, remember = req.remember_me, "login");
    Ok(Json(TokenResponse {
        token: jwt.session_token(user.id)?,
        expires_in: jwt.session_seconds(),
        remember_token,
        user,
    }))
}

/// Trade a stale (remembered) login for a fresh one.
pub async fn re_authenticate(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<RecordService>>,
    Extension(jwt): Extension<JwtConfig>,
    Json(req): Json<ReAuthRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    service.re_authenticate(&principal, &req.password).await?;
    Ok(Json(TokenResponse {
        token: jwt.session_token(principal.id())?,
        expires_in: jwt.session_seconds(),
        remember_token: None,
        user: principal.user,
    }))
}

/// Tokens are stateless; the client drops them.
pub async fn logout(Extension(principal): Extension<Principal>) -> Json<Value> {
    tracing::info!(number = %principal.user.number, "logout");
    Json(json!({ "message": "You have been logged out." }))
}
