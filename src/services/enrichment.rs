use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::trip::{ProcessingStatus, Trip, WeatherDay};
use crate::services::trips::TripStore;
use crate::services::weather::WeatherClient;

/// Seam over the forecast client so enrichment can be driven with scripted
/// outcomes in tests.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeatherDay>, AppError>;
}

#[async_trait]
impl ForecastProvider for WeatherClient {
    async fn daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeatherDay>, AppError> {
        WeatherClient::daily_forecast(self, latitude, longitude, start, end).await
    }
}

/// Follow-up enrichment for a stored trip: mark it `PROCESSING`, fetch the
/// daily forecast for its resolved coordinates, then land on `COMPLETED`
/// with the payload or on `FAILED`.
///
/// Trips created without coordinates (validation skipped or unsuccessful)
/// fail enrichment; the terminal `FAILED` status is the only signal.
pub async fn enrich_trip<W>(
    store: &TripStore,
    weather: &W,
    user_id: i64,
    trip_id: &str,
) -> Result<Trip, AppError>
where
    W: ForecastProvider + ?Sized,
{
    let trip = store.get_trip(user_id, trip_id).await?;

    let (Some(latitude), Some(longitude)) = (trip.latitude, trip.longitude) else {
        warn!(trip_id, "enrichment without coordinates");
        return store
            .update_status(user_id, trip_id, ProcessingStatus::Failed, None)
            .await;
    };

    store
        .update_status(user_id, trip_id, ProcessingStatus::Processing, None)
        .await?;

    match weather
        .daily_forecast(latitude, longitude, trip.start_date, trip.end_date)
        .await
    {
        Ok(days) => {
            info!(trip_id, days = days.len(), "trip enrichment completed");
            store
                .update_status(user_id, trip_id, ProcessingStatus::Completed, Some(&days))
                .await
        }
        Err(err) => {
            warn!(trip_id, "trip enrichment failed: {err}");
            store
                .update_status(user_id, trip_id, ProcessingStatus::Failed, None)
                .await
        }
    }
}
