//! JWT authentication middleware.
//!
//! Tokens are HS256 with `sub` (user id), `iat`, `exp` and `fresh`. A valid
//! token is turned into a [`Principal`] by reloading the user and its
//! role's grants, then inserted into request extensions.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use recordit_core::error::RecordError;
use recordit_core::principal::Principal;
use recordit_core::roles::Role;
use recordit_core::service::{RecordService, LOGIN_REQUIRED};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub fresh: bool,
}

/// Signing keys and token lifetimes.
#[derive(Clone)]
pub struct JwtConfig {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session: Duration,
    remember: Duration,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            session: Duration::minutes(3),
            remember: Duration::days(365),
        }
    }

    pub fn with_lifetimes(mut self, session: Duration, remember: Duration) -> Self {
        self.session = session;
        self.remember = remember;
        self
    }

    pub fn session_seconds(&self) -> i64 {
        self.session.num_seconds()
    }

    /// Fresh token issued right after a password check.
    pub fn session_token(&self, user_id: i64) -> Result<String, AppError> {
        self.issue(user_id, true, self.session)
    }

    /// Long-lived, non-fresh token for "remember me".
    pub fn remember_token(&self, user_id: i64) -> Result<String, AppError> {
        self.issue(user_id, false, self.remember)
    }

    fn issue(&self, user_id: i64, fresh: bool, lifetime: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            fresh,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError(RecordError::Internal(anyhow::anyhow!(e))))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected token");
                login_required()
            })
    }
}

fn login_required() -> AppError {
    AppError(RecordError::Unauthorized(LOGIN_REQUIRED.into()))
}

/// Client address: the socket peer, or the first `X-Forwarded-For` hop.
fn remote_addr(req: &Request) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

/// Verify the bearer token and attach the caller's [`Principal`].
pub async fn jwt_auth(
    Extension(jwt): Extension<JwtConfig>,
    Extension(service): Extension<Arc<RecordService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(login_required)?;
    let claims = jwt.verify(token)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| login_required())?;

    let principal = service
        .principal_for(user_id, claims.fresh)
        .await?
        .with_remote_addr(remote_addr(&req));
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Gate for the admin area: a fresh Teacher or Administrator.
pub async fn require_staff(
    Extension(principal): Extension<Principal>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    principal.require_any_role(&[Role::Teacher, Role::Administrator])?;
    principal.require_fresh()?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_tokens_are_fresh() {
        let jwt = JwtConfig::from_secret(b"k");
        let claims = jwt.verify(&jwt.session_token(42).unwrap()).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.fresh);
        assert_eq!(claims.exp - claims.iat, 180);
    }

    #[test]
    fn remember_tokens_are_not_fresh() {
        let jwt = JwtConfig::from_secret(b"k");
        let claims = jwt.verify(&jwt.remember_token(42).unwrap()).unwrap();
        assert!(!claims.fresh);
        assert_eq!(claims.exp - claims.iat, 365 * 24 * 3600);
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let jwt = JwtConfig::from_secret(b"k")
            .with_lifetimes(Duration::seconds(-10), Duration::days(1));
        assert!(jwt.verify(&jwt.session_token(1).unwrap()).is_err());

        let other = JwtConfig::from_secret(b"other");
        let token = other.session_token(1).unwrap();
        assert!(JwtConfig::from_secret(b"k").verify(&token).is_err());
    }
}
