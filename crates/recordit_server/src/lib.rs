//! recordit REST server: axum router, JWT middleware and handlers over
//! [`recordit_core::service::RecordService`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod telemetry;
