//! rfmt-server library interface
//!
//! Exposes the router, state and import pipeline for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod import;
pub mod pagination;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::import::{ImportService, ImportTracker};
use crate::store::SqliteStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// CSV import pipeline and its job state
    pub import: ImportService,
    /// Where uploads are staged before import
    pub upload_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State wired to the SQLite store with a fresh, idle import tracker
    pub fn new(db: SqlitePool, upload_dir: PathBuf, batch_size: usize) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));
        let import = ImportService::new(store, ImportTracker::new(), batch_size);
        Self::with_import(db, import, upload_dir)
    }

    /// State around an already built import service
    pub fn with_import(db: SqlitePool, import: ImportService, upload_dir: PathBuf) -> Self {
        Self {
            db,
            import,
            upload_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::rfmt_routes())
        .merge(api::import_routes())
        .merge(api::unit_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
