//! Unit lookup for the RFMT form

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::units::{self, Unit};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UnitSearchQuery {
    pub search: Option<String>,
}

/// GET /api/units/search?search=
///
/// Active units only, at most 50, ordered by unit code.
pub async fn search_units(
    State(state): State<AppState>,
    Query(query): Query<UnitSearchQuery>,
) -> ApiResult<Json<Vec<Unit>>> {
    Ok(Json(units::search_units(&state.db, query.search.as_deref()).await?))
}

/// Build unit routes
pub fn unit_routes() -> Router<AppState> {
    Router::new().route("/api/units/search", get(search_units))
}
