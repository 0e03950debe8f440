//! recordit: academic record-keeping server.
//!
//! Reads config from env vars (a `.env` file is loaded first):
//!   RECORDIT_DATABASE_URL  Postgres connection string (fallback DATABASE_URL)
//!   RECORDIT_JWT_SECRET    JWT HMAC secret (required in production)
//!   RECORDIT_BIND_ADDR     listen address (default: 0.0.0.0:5000)
//!
//! See [`recordit_server::config`] for the rest.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use recordit_core::service::RecordService;
use recordit_postgres::PgStores;
use recordit_server::config::Config;
use recordit_server::router::build_router;
use recordit_server::telemetry;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "recordit", version, about = "Academic record-keeping server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address, overrides RECORDIT_BIND_ADDR
        #[arg(long, env = "RECORDIT_BIND_ADDR")]
        bind: Option<String>,
    },
    /// Create the schema, roles and the default administrator
    Init {
        /// Drop every table first
        #[arg(long)]
        drop: bool,
        /// Confirm --drop
        #[arg(long)]
        yes: bool,
    },
    /// Rebuild the schema and fill it with random students
    Forge {
        #[arg(long, default_value_t = 50)]
        students: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    telemetry::init(Some(&config.log_dir));
    tracing::debug!(profile = ?config.profile, "configuration loaded");

    match cli.command {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Init { drop, yes } => init(config, drop, yes).await,
        Command::Forge { students } => forge(config, students).await,
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Connected to database");
    Ok(pool)
}

fn build_service(config: &Config, pool: PgPool) -> Arc<RecordService> {
    Arc::new(RecordService::new(
        PgStores::new(pool).into_stores(),
        config.service_settings(),
        config.attachment_store(),
    ))
}

async fn serve(config: Config, bind: Option<String>) -> anyhow::Result<()> {
    let pool = connect(&config).await?;
    let service = build_service(&config, pool);
    let app = build_router(service, config.jwt_config(), config.max_content_length);

    let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!("recordit listening on {bind_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}

async fn init(config: Config, drop: bool, yes: bool) -> anyhow::Result<()> {
    if drop && !yes {
        bail!("refusing to drop every table without --yes");
    }
    let pool = connect(&config).await?;
    if drop {
        recordit_postgres::drop_schema(&pool).await?;
    }
    recordit_postgres::create_schema(&pool).await?;

    let service = build_service(&config, pool);
    service.init_roles().await?;
    match service.ensure_admin().await? {
        Some(admin) => tracing::info!(number = %admin.number, "administrator created"),
        None => tracing::info!("administrator already present"),
    }
    Ok(())
}

async fn forge(config: Config, students: usize) -> anyhow::Result<()> {
    let pool = connect(&config).await?;
    recordit_postgres::drop_schema(&pool).await?;
    recordit_postgres::create_schema(&pool).await?;

    let service = build_service(&config, pool);
    service.init_roles().await?;
    service.ensure_admin().await?;
    let created = service.forge_students(students).await?;
    tracing::info!(requested = students, created, "students forged");
    Ok(())
}
