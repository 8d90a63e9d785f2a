use std::{collections::HashMap, fmt, fs::File, net::SocketAddr};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use cucumber::{given, then, when, World as _};
use packwise::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    db::init_pool,
    error::AppError,
    models::trip::{ProcessingStatus, Trip, TripType, WeatherDay},
    services::{
        enrichment::{self, ForecastProvider},
        locations::LocationClient,
        trips::NewTrip,
        weather::WeatherClient,
    },
    state::AppState,
};
use tempfile::TempDir;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, AuthenticatedUser>,
    trip: Option<Trip>,
    session: Option<String>,
    last_error: Option<AppError>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self, username: &str) -> &AuthenticatedUser {
        self.users
            .get(username)
            .unwrap_or_else(|| panic!("user {username} must be registered first"))
    }

    fn trip(&self) -> &Trip {
        self.trip.as_ref().expect("a trip must be created first")
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;

        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            // Unroutable on purpose; no scenario below reaches upstream.
            geocoding_base_url: "http://127.0.0.1:9".into(),
            forecast_base_url: "http://127.0.0.1:9".into(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let http = reqwest::Client::new();
        let locations = LocationClient::new(http.clone(), config.geocoding_base_url.clone());
        let weather = WeatherClient::new(http, config.forecast_base_url.clone());

        let app = AppState::new(config, db, locations, weather);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

/// Forecast stand-in that always answers with one entry per calendar day in
/// the inclusive range.
struct ScriptedForecast;

#[async_trait]
impl ForecastProvider for ScriptedForecast {
    async fn daily_forecast(
        &self,
        _latitude: f64,
        _longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeatherDay>, AppError> {
        Ok(forecast_days(start, (end - start).num_days() + 1))
    }
}

fn forecast_days(start: NaiveDate, count: i64) -> Vec<WeatherDay> {
    (0..count)
        .map(|offset| WeatherDay {
            day: start + Duration::days(offset),
            max_temp: 20.0 + offset as f64,
            low_temp: 10.0 + offset as f64,
        })
        .collect()
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.trip = None;
    world.session = None;
    world.last_error = None;
}

#[given(
    regex = r#"^a registered user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let created = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user");
    world.users.insert(username, created);
}

#[when(
    regex = r#"^I register a user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    match auth::register_user(world.app_state(), &username, &email, &password).await {
        Ok(created) => {
            world.users.insert(username, created);
        }
        Err(err) => world.last_error = Some(err),
    }
}

#[then(regex = r#"^I can authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, identifier: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &identifier, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.username, identifier);
}

#[then(regex = r#"^authentication as \"([^\"]+)\" with password \"([^\"]+)\" fails$"#)]
async fn then_authentication_fails(world: &mut AppWorld, identifier: String, password: String) {
    let result = auth::authenticate_user(world.app_state(), &identifier, &password).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[when(regex = r#"^\"([^\"]+)\" starts a session$"#)]
async fn when_start_session(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id;
    let session_id = auth::create_session(world.app_state(), user_id)
        .await
        .expect("create session");
    world.session = Some(session_id);
}

#[when("the session expires")]
async fn when_session_expires(world: &mut AppWorld) {
    let session_id = world.session.clone().expect("a session must exist first");
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::days(1))
        .bind(&session_id)
        .execute(&world.app_state().db)
        .await
        .expect("expire session");
}

#[then(regex = r#"^the session resolves to \"([^\"]+)\"$"#)]
async fn then_session_resolves(world: &mut AppWorld, username: String) {
    let session_id = world.session.clone().expect("a session must exist first");
    let resolved = auth::load_session_user(world.app_state(), &session_id)
        .await
        .expect("load session");
    assert_eq!(resolved.map(|user| user.username), Some(username));
}

#[then("the session no longer resolves to a user")]
async fn then_session_is_gone(world: &mut AppWorld) {
    let session_id = world.session.clone().expect("a session must exist first");
    let resolved = auth::load_session_user(world.app_state(), &session_id)
        .await
        .expect("load session");
    assert!(resolved.is_none());
}

#[then("registration fails")]
async fn then_registration_fails(world: &mut AppWorld) {
    assert!(matches!(
        world.last_error.take(),
        Some(AppError::BadRequest(_))
    ));
}

#[given(
    regex = r#"^\"([^\"]+)\" creates a trip \"([^\"]+)\" to \"([^\"]+)\" from (\d{4}-\d{2}-\d{2}) to (\d{4}-\d{2}-\d{2})$"#
)]
#[when(
    regex = r#"^\"([^\"]+)\" creates a trip \"([^\"]+)\" to \"([^\"]+)\" from (\d{4}-\d{2}-\d{2}) to (\d{4}-\d{2}-\d{2})$"#
)]
async fn when_create_trip(
    world: &mut AppWorld,
    username: String,
    title: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
) {
    let user_id = world.user(&username).id;
    let new = NewTrip {
        title,
        destination,
        start_date,
        end_date,
        trip_type: TripType::CityBreak,
        description: None,
        latitude: None,
        longitude: None,
    };
    match world.app_state().trips.create_trip(user_id, new).await {
        Ok(trip) => world.trip = Some(trip),
        Err(err) => world.last_error = Some(err),
    }
}

#[given(
    regex = r#"^\"([^\"]+)\" creates a trip \"([^\"]+)\" to \"([^\"]+)\" at (-?[\d.]+), (-?[\d.]+) from (\d{4}-\d{2}-\d{2}) to (\d{4}-\d{2}-\d{2})$"#
)]
#[when(
    regex = r#"^\"([^\"]+)\" creates a trip \"([^\"]+)\" to \"([^\"]+)\" at (-?[\d.]+), (-?[\d.]+) from (\d{4}-\d{2}-\d{2}) to (\d{4}-\d{2}-\d{2})$"#
)]
#[allow(clippy::too_many_arguments)]
async fn when_create_trip_with_coordinates(
    world: &mut AppWorld,
    username: String,
    title: String,
    destination: String,
    latitude: f64,
    longitude: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) {
    let user_id = world.user(&username).id;
    let new = NewTrip {
        title,
        destination,
        start_date,
        end_date,
        trip_type: TripType::CityBreak,
        description: None,
        latitude: Some(latitude),
        longitude: Some(longitude),
    };
    match world.app_state().trips.create_trip(user_id, new).await {
        Ok(trip) => world.trip = Some(trip),
        Err(err) => world.last_error = Some(err),
    }
}

#[when(regex = r#"^\"([^\"]+)\" runs enrichment for the trip$"#)]
async fn when_run_enrichment(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id;
    let trip_id = world.trip().id.clone();
    let app = world.app_state();
    match enrichment::enrich_trip(&app.trips, &app.weather, user_id, &trip_id).await {
        Ok(trip) => world.trip = Some(trip),
        Err(err) => world.last_error = Some(err),
    }
}

#[when(regex = r#"^\"([^\"]+)\" runs enrichment with a reachable forecast$"#)]
async fn when_run_enrichment_scripted(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id;
    let trip_id = world.trip().id.clone();
    let app = world.app_state();
    match enrichment::enrich_trip(&app.trips, &ScriptedForecast, user_id, &trip_id).await {
        Ok(trip) => world.trip = Some(trip),
        Err(err) => world.last_error = Some(err),
    }
}

#[then(regex = r#"^the trip is stored with duration (\d+) and status \"([A-Z_]+)\"$"#)]
async fn then_trip_stored(world: &mut AppWorld, duration: i64, status: ProcessingStatus) {
    let trip = world.trip().clone();
    assert_eq!(trip.duration, duration);
    assert_eq!(trip.processing_status, status);

    let stored = world
        .app_state()
        .trips
        .get_trip(trip.user_id, &trip.id)
        .await
        .expect("trip readable after creation");
    assert_eq!(stored.duration, duration);
    assert_eq!(stored.processing_status, status);
}

#[then(regex = r#"^trip creation fails with \"([^\"]+)\"$"#)]
async fn then_trip_creation_fails(world: &mut AppWorld, message: String) {
    match world.last_error.take() {
        Some(AppError::BadRequest(msg)) => assert_eq!(msg, message),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[then(regex = r#"^\"([^\"]+)\" has (\d+) stored trips$"#)]
async fn then_user_has_trips(world: &mut AppWorld, username: String, expected: usize) {
    let user_id = world.user(&username).id;
    let trips = world
        .app_state()
        .trips
        .list_trips(user_id)
        .await
        .expect("list trips");
    assert_eq!(trips.len(), expected);
}

#[then(regex = r#"^the trip list for \"([^\"]+)\" has (\d+) trip(?:s)?$"#)]
async fn then_trip_list_len(world: &mut AppWorld, username: String, expected: usize) {
    then_user_has_trips(world, username, expected).await;
}

#[then(regex = r#"^the trip list for \"([^\"]+)\" starts with \"([^\"]+)\"$"#)]
async fn then_trip_list_order(world: &mut AppWorld, username: String, title: String) {
    let user_id = world.user(&username).id;
    let trips = world
        .app_state()
        .trips
        .list_trips(user_id)
        .await
        .expect("list trips");
    assert_eq!(trips.first().map(|t| t.title.as_str()), Some(title.as_str()));
}

#[then("the trip list response has no weather payload field")]
async fn then_list_has_no_weather(world: &mut AppWorld) {
    let trip = world.trip().clone();
    let trips = world
        .app_state()
        .trips
        .list_trips(trip.user_id)
        .await
        .expect("list trips");
    let json = serde_json::to_value(&trips).expect("serialize trip list");
    for entry in json.as_array().expect("trip list is an array") {
        let object = entry.as_object().expect("trip entry is an object");
        assert!(!object.contains_key("weather_data"));
        assert!(object.contains_key("processing_status"));
    }
}

#[when(regex = r#"^\"([^\"]+)\" marks the trip \"([A-Z_]+)\"$"#)]
async fn when_mark_trip(world: &mut AppWorld, username: String, status: ProcessingStatus) {
    let user_id = world.user(&username).id;
    let trip_id = world.trip().id.clone();
    match world
        .app_state()
        .trips
        .update_status(user_id, &trip_id, status, None)
        .await
    {
        Ok(trip) => world.trip = Some(trip),
        Err(err) => world.last_error = Some(err),
    }
}

#[when(regex = r#"^\"([^\"]+)\" marks the trip \"([A-Z_]+)\" with a (\d+) day forecast$"#)]
async fn when_mark_trip_with_forecast(
    world: &mut AppWorld,
    username: String,
    status: ProcessingStatus,
    days: i64,
) {
    let user_id = world.user(&username).id;
    let trip = world.trip().clone();
    let forecast = forecast_days(trip.start_date, days);
    match world
        .app_state()
        .trips
        .update_status(user_id, &trip.id, status, Some(&forecast))
        .await
    {
        Ok(updated) => world.trip = Some(updated),
        Err(err) => world.last_error = Some(err),
    }
}

#[then(regex = r#"^\"([^\"]+)\" sees trip status \"([A-Z_]+)\" with (\d+) weather entries$"#)]
async fn then_sees_status_with_entries(
    world: &mut AppWorld,
    username: String,
    status: ProcessingStatus,
    entries: usize,
) {
    let user_id = world.user(&username).id;
    let trip_id = world.trip().id.clone();
    let read = world
        .app_state()
        .trips
        .trip_status(user_id, &trip_id)
        .await
        .expect("trip status");
    assert_eq!(read.processing_status, status);
    let days = read.weather_data.expect("weather payload present");
    assert_eq!(days.len(), entries);
    for pair in days.windows(2) {
        assert!(pair[0].day < pair[1].day);
    }
}

#[then(regex = r#"^\"([^\"]+)\" sees trip status \"([A-Z_]+)\" with no weather entries$"#)]
async fn then_sees_status_without_entries(
    world: &mut AppWorld,
    username: String,
    status: ProcessingStatus,
) {
    let user_id = world.user(&username).id;
    let trip_id = world.trip().id.clone();
    let read = world
        .app_state()
        .trips
        .trip_status(user_id, &trip_id)
        .await
        .expect("trip status");
    assert_eq!(read.processing_status, status);
    assert!(read.weather_data.is_none());
}

#[then("the status operation fails with not found")]
async fn then_status_op_not_found(world: &mut AppWorld) {
    assert!(matches!(world.last_error.take(), Some(AppError::NotFound)));
}

#[then(regex = r#"^reading the trip status as \"([^\"]+)\" fails with not found$"#)]
async fn then_read_status_not_found(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id;
    let trip_id = world.trip().id.clone();
    let result = world.app_state().trips.trip_status(user_id, &trip_id).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[then(regex = r#"^reading a nonexistent trip status as \"([^\"]+)\" fails with not found$"#)]
async fn then_read_missing_not_found(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id;
    let result = world
        .app_state()
        .trips
        .trip_status(user_id, "00000000-0000-0000-0000-000000000000")
        .await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
