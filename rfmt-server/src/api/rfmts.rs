//! RFMT record CRUD handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::rfmts::{self, Rfmt, RfmtFilter, RfmtInput};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, DEFAULT_LIMIT};
use crate::AppState;

/// Query parameters for GET /api/rfmts
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub search: Option<String>,
    pub pn: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// GET /api/rfmts response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Rfmt>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// GET /api/rfmts
pub async fn list_rfmts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let pagination = calculate_pagination(query.page, query.limit);
    let filter = RfmtFilter {
        search: query.search.map(|s| s.trim().to_string()),
        personnel_number: query.pn.map(|s| s.trim().to_string()),
    };

    let (data, total) =
        rfmts::list_rfmts(&state.db, &filter, pagination.limit, pagination.offset).await?;

    Ok(Json(ListResponse {
        data,
        total,
        page: pagination.page,
        limit: pagination.limit,
    }))
}

/// GET /api/rfmts/:id
pub async fn get_rfmt(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Rfmt>> {
    rfmts::load_rfmt(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/rfmts
pub async fn create_rfmt(
    State(state): State<AppState>,
    body: Result<Json<RfmtInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Rfmt>)> {
    let input = parse_body(body)?.validate()?;
    let rfmt = rfmts::create_rfmt(&state.db, &input).await?;

    tracing::info!(id = rfmt.id, pn = %rfmt.personnel_number, "RFMT created");
    Ok((StatusCode::CREATED, Json(rfmt)))
}

/// PUT /api/rfmts/:id
pub async fn update_rfmt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<RfmtInput>, JsonRejection>,
) -> ApiResult<Json<Rfmt>> {
    if rfmts::load_rfmt(&state.db, id).await?.is_none() {
        return Err(not_found(id));
    }

    let input = parse_body(body)?.validate()?;
    rfmts::update_rfmt(&state.db, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/rfmts/:id (soft delete)
pub async fn delete_rfmt(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    if !rfmts::soft_delete_rfmt(&state.db, id).await? {
        return Err(not_found(id));
    }

    tracing::info!(id, "RFMT deleted");
    Ok(Json(json!({ "message": "RFMT deleted successfully" })))
}

/// DELETE /api/rfmts/all
pub async fn delete_all_rfmts(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let deleted = rfmts::delete_all_rfmts(&state.db).await?;

    tracing::warn!(deleted, "All RFMT records deleted");
    Ok(Json(json!({
        "message": "All RFMT records deleted successfully",
        "deleted": deleted,
    })))
}

/// GET /api/rfmts/pipeline/:pn
pub async fn list_by_pipeline_pn(
    State(state): State<AppState>,
    Path(pn): Path<String>,
) -> ApiResult<Json<Vec<Rfmt>>> {
    Ok(Json(rfmts::list_by_personnel_number(&state.db, &pn).await?))
}

fn parse_body(body: Result<Json<RfmtInput>, JsonRejection>) -> ApiResult<RfmtInput> {
    body.map(|Json(input)| input)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("RFMT not found: {}", id))
}

/// Build RFMT CRUD routes
pub fn rfmt_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rfmts", get(list_rfmts).post(create_rfmt))
        .route("/api/rfmts/all", delete(delete_all_rfmts))
        .route("/api/rfmts/pipeline/:pn", get(list_by_pipeline_pn))
        .route(
            "/api/rfmts/:id",
            get(get_rfmt).put(update_rfmt).delete(delete_rfmt),
        )
}
