//! rfmt-server - RFMT record management service
//!
//! Serves CRUD endpoints over RFMT (personnel reassignment) records and
//! imports them in bulk from `;`-delimited CSV uploads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rfmt_common::config::{self, ROOT_FOLDER_ENV};
use tracing::info;

use rfmt_server::{build_router, AppState};

/// Command-line arguments; each can also come from the environment
#[derive(Debug, Parser)]
#[command(name = "rfmt-server", version, about = "RFMT record management service")]
struct Args {
    /// Folder holding the database and staged uploads
    #[arg(long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<String>,

    /// Explicit config.toml location
    #[arg(long, env = "RFMT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, env = "RFMT_BIND")]
    bind: Option<String>,

    /// Records per bulk insert during CSV import
    #[arg(long, env = "RFMT_BATCH_SIZE")]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(
        "Starting rfmt-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    // CLI/env > TOML > defaults
    let toml_config = config::load_toml_config(args.config.as_deref())?;
    let root_folder =
        config::resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, Some(&toml_config));
    std::fs::create_dir_all(&root_folder).with_context(|| {
        format!("Failed to create root folder {}", root_folder.display())
    })?;

    let batch_size = match args.batch_size {
        Some(size) => config::validate_batch_size(size)?,
        None => toml_config.batch_size()?,
    };
    let bind_address = args.bind.unwrap_or_else(|| toml_config.bind_address());
    let upload_dir = toml_config.upload_dir(&root_folder);

    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let pool = rfmt_server::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    info!(batch_size, upload_dir = %upload_dir.display(), "Import configured");
    let state = AppState::new(pool, upload_dir, batch_size);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
