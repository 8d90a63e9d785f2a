pub mod locations;
pub mod public;
pub mod trips;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/api/trips", trips::router())
        .nest("/api/items", trips::items_router())
        .nest("/api/locations", locations::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
