use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    services::locations::{GeocodingResponse, MIN_QUERY_LEN},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
}

async fn search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<GeocodingResponse>, AppError> {
    current.require_user()?;
    if params.query.chars().count() < MIN_QUERY_LEN {
        return Err(AppError::BadRequest(
            "Query must be at least 2 characters".into(),
        ));
    }
    Ok(Json(state.locations.search(&params.query).await?))
}
