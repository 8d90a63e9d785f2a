use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::{
        ItemCategory, ProcessingStatus, Trip, TripStatus, TripSummary, TripType, WeatherDay,
    },
    services::{enrichment, trips::NewTrip},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip).get(list_trips))
        .route("/types", get(trip_types))
        .route("/:id/status", get(trip_status).put(update_trip_status))
        .route("/:id/process", post(process_trip))
}

pub fn items_router() -> Router<AppState> {
    Router::new().route("/categories", get(item_categories))
}

#[derive(Deserialize)]
struct CreateTripRequest {
    title: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    trip_type: TripType,
    description: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<CreateTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    let trip = state
        .trips
        .create_trip(
            user.id,
            NewTrip {
                title: body.title,
                destination: body.destination,
                start_date: body.start_date,
                end_date: body.end_date,
                trip_type: body.trip_type,
                description: body.description,
                latitude: body.latitude,
                longitude: body.longitude,
            },
        )
        .await?;
    Ok(Json(trip))
}

async fn list_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<TripSummary>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.list_trips(user.id).await?))
}

async fn trip_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<TripStatus>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.trip_status(user.id, &trip_id).await?))
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    status: ProcessingStatus,
    weather_data: Option<Vec<WeatherDay>>,
}

async fn update_trip_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    let trip = state
        .trips
        .update_status(user.id, &trip_id, body.status, body.weather_data.as_deref())
        .await?;
    Ok(Json(trip))
}

/// Runs the weather enrichment for a stored trip end to end.
async fn process_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    let trip = enrichment::enrich_trip(&state.trips, &state.weather, user.id, &trip_id).await?;
    Ok(Json(trip))
}

async fn trip_types(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<&'static [TripType]>, AppError> {
    current.require_user()?;
    Ok(Json(state.trips.trip_types()))
}

async fn item_categories(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<&'static [ItemCategory]>, AppError> {
    current.require_user()?;
    Ok(Json(state.trips.item_categories()))
}
