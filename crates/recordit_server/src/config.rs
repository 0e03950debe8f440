//! Server configuration, read from the environment.
//!
//! `.env` is loaded first (see `main`). Every value has a development
//! default except the JWT secret in production.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use recordit_core::attachments::{AttachmentStore, DEFAULT_EXTENSIONS};
use recordit_core::settings::{ServiceSettings, DEFAULT_ADMIN_NUMBER};

use crate::middleware::jwt::JwtConfig;

const DEV_JWT_SECRET: &str = "secret key";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_MAX_CONTENT_LENGTH: usize = 17 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Testing,
    Production,
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "default" => Ok(Profile::Development),
            "testing" => Ok(Profile::Testing),
            "production" => Ok(Profile::Production),
            other => Err(anyhow!("unknown RECORDIT_CONFIG profile: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub profile: Profile,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub upload_path: PathBuf,
    pub log_dir: PathBuf,
    pub admin_number: String,
    pub session_minutes: i64,
    pub remember_days: i64,
    pub max_content_length: usize,
    pub score_lower: i32,
    pub score_upper: i32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let profile = match lookup("RECORDIT_CONFIG") {
            Some(p) => p.parse()?,
            None => Profile::Development,
        };

        let jwt_secret = match (lookup("RECORDIT_JWT_SECRET"), profile) {
            (Some(secret), _) if !secret.is_empty() => secret,
            (_, Profile::Production) => bail!("RECORDIT_JWT_SECRET must be set in production"),
            _ => DEV_JWT_SECRET.to_string(),
        };

        let config = Self {
            profile,
            database_url: lookup("RECORDIT_DATABASE_URL").or_else(|| lookup("DATABASE_URL")),
            jwt_secret,
            bind_addr: lookup("RECORDIT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            upload_path: lookup("RECORDIT_UPLOAD_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            log_dir: lookup("RECORDIT_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs")),
            admin_number: lookup("RECORDIT_ADMIN_NUMBER")
                .unwrap_or_else(|| DEFAULT_ADMIN_NUMBER.into()),
            session_minutes: parse_or(&lookup, "RECORDIT_SESSION_MINUTES", 3)?,
            remember_days: parse_or(&lookup, "RECORDIT_REMEMBER_DAYS", 365)?,
            max_content_length: parse_or(
                &lookup,
                "RECORDIT_MAX_CONTENT_LENGTH",
                DEFAULT_MAX_CONTENT_LENGTH,
            )?,
            score_lower: parse_or(&lookup, "RECORDIT_SCORE_LOWER", 0)?,
            score_upper: parse_or(&lookup, "RECORDIT_SCORE_UPPER", 100)?,
        };
        if config.score_lower > config.score_upper {
            bail!(
                "RECORDIT_SCORE_LOWER ({}) exceeds RECORDIT_SCORE_UPPER ({})",
                config.score_lower,
                config.score_upper
            );
        }
        Ok(config)
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("RECORDIT_DATABASE_URL (or DATABASE_URL) must be set"))
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            admin_number: self.admin_number.clone(),
            score_lower: self.score_lower,
            score_upper: self.score_upper,
            log_dir: self.log_dir.clone(),
            ..ServiceSettings::default()
        }
    }

    pub fn attachment_store(&self) -> AttachmentStore {
        AttachmentStore::new(self.upload_path.clone(), DEFAULT_EXTENSIONS.iter().copied())
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::from_secret(self.jwt_secret.as_bytes()).with_lifetimes(
            chrono::Duration::minutes(self.session_minutes),
            chrono::Duration::days(self.remember_days),
        )
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw}")),
        None => Ok(default),
    }
}
