//! CSV import handlers
//!
//! POST /api/rfmts/import, GET /api/rfmts/import/progress

use std::path::Path;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::import::{ImportProgress, ImportStatus, StartOutcome};
use crate::AppState;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const CONFLICT_MESSAGE: &str = "Import already in progress";

/// POST /api/rfmts/import response
#[derive(Debug, Serialize)]
pub struct StartImportResponse {
    pub message: String,
    pub filename: String,
    pub size: usize,
}

/// POST /api/rfmts/import
///
/// Expects a multipart field named `file` holding a `.csv` upload. The file
/// is staged in the upload directory and imported in the background; poll
/// the progress endpoint for the outcome.
pub async fn import_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<StartImportResponse>> {
    // Cheap early exit; admission below is the authoritative check
    if state.import.tracker().status().await == ImportStatus::Processing {
        return Err(ApiError::Conflict(CONFLICT_MESSAGE.to_string()));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .filter(|(filename, _)| !filename.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    if !filename.to_lowercase().ends_with(".csv") {
        return Err(ApiError::BadRequest("File must be CSV".to_string()));
    }

    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let staged = state.upload_dir.join(staged_file_name(&filename));
    tokio::fs::write(&staged, &bytes).await?;

    match state.import.start_import(staged.clone()).await {
        StartOutcome::Accepted => {
            tracing::info!(filename = %filename, size = bytes.len(), "CSV import started");
            Ok(Json(StartImportResponse {
                message: "CSV import started".to_string(),
                filename,
                size: bytes.len(),
            }))
        }
        StartOutcome::Conflict => {
            if let Err(e) = tokio::fs::remove_file(&staged).await {
                tracing::warn!(path = %staged.display(), error = %e, "Failed to remove rejected upload");
            }
            Err(ApiError::Conflict(CONFLICT_MESSAGE.to_string()))
        }
    }
}

/// GET /api/rfmts/import/progress
pub async fn get_import_progress(State(state): State<AppState>) -> Json<ImportProgress> {
    Json(state.import.progress().await)
}

/// Unique on-disk name for an upload, keeping only its final path component
fn staged_file_name(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    format!("{}-{}", chrono::Utc::now().format("%Y%m%d%H%M%S%f"), base)
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/rfmts/import",
            post(import_csv).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/rfmts/import/progress", get(get_import_progress))
}
