use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::trip::{
    ItemCategory, PackingItem, PackingListWithItems, ProcessingStatus, Trip, TripStatus,
    TripSummary, TripType, WeatherDay,
};

/// Input for trip creation. Coordinates are whatever the destination
/// validation flow last resolved; creation is deliberately not blocked on a
/// successful resolution, so both may be absent.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trip_type: TripType,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Whole days between the two dates. Dates are day-granular, so the ceiling
/// division of the millisecond difference collapses to a plain difference.
pub fn trip_duration(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

fn validate_new_trip(new: &NewTrip) -> Result<(), AppError> {
    if new.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    if new.destination.trim().is_empty() {
        return Err(AppError::BadRequest("Destination is required".into()));
    }
    if new.end_date <= new.start_date {
        return Err(AppError::BadRequest(
            "End date must be after start date".into(),
        ));
    }
    if new.latitude.is_some() != new.longitude.is_some() {
        return Err(AppError::BadRequest(
            "Latitude and longitude must be provided together".into(),
        ));
    }
    Ok(())
}

/// All trip reads and writes take the owning user's id as a mandatory
/// parameter; a trip belonging to someone else is indistinguishable from one
/// that does not exist.
#[derive(Clone)]
pub struct TripStore {
    db: DbPool,
}

impl TripStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create_trip(&self, user_id: i64, new: NewTrip) -> Result<Trip, AppError> {
        validate_new_trip(&new)?;

        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            user_id,
            duration: trip_duration(new.start_date, new.end_date),
            title: new.title,
            destination: new.destination,
            start_date: new.start_date,
            end_date: new.end_date,
            trip_type: new.trip_type,
            description: new.description,
            latitude: new.latitude,
            longitude: new.longitude,
            processing_status: ProcessingStatus::Pending,
            weather_data: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO trips
               (id, user_id, title, destination, start_date, end_date, duration,
                trip_type, description, latitude, longitude, processing_status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&trip.id)
        .bind(trip.user_id)
        .bind(&trip.title)
        .bind(&trip.destination)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(trip.duration)
        .bind(trip.trip_type.as_str())
        .bind(&trip.description)
        .bind(trip.latitude)
        .bind(trip.longitude)
        .bind(trip.processing_status.as_str())
        .bind(trip.created_at)
        .execute(&self.db)
        .await?;

        Ok(trip)
    }

    pub async fn get_trip(&self, user_id: i64, trip_id: &str) -> Result<Trip, AppError> {
        let row = sqlx::query(r#"SELECT * FROM trips WHERE id = ? AND user_id = ?"#)
            .bind(trip_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        trip_from_row(&row)
    }

    /// Caller's trips, newest start date first, each with its packing list.
    /// The stored weather payload is never part of this projection.
    pub async fn list_trips(&self, user_id: i64) -> Result<Vec<TripSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, title, destination, start_date, end_date, duration,
                      trip_type, description, latitude, longitude,
                      processing_status, created_at
               FROM trips WHERE user_id = ?
               ORDER BY start_date DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut trips = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let packing_list = self.packing_list_for_trip(&id).await?;
            trips.push(TripSummary {
                id,
                title: row.try_get("title")?,
                destination: row.try_get("destination")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
                duration: row.try_get("duration")?,
                trip_type: parse_column(row.try_get("trip_type")?)?,
                description: row.try_get("description")?,
                latitude: row.try_get("latitude")?,
                longitude: row.try_get("longitude")?,
                processing_status: parse_column(row.try_get("processing_status")?)?,
                created_at: row.try_get("created_at")?,
                packing_list,
            });
        }
        Ok(trips)
    }

    pub async fn trip_status(&self, user_id: i64, trip_id: &str) -> Result<TripStatus, AppError> {
        let row = sqlx::query(
            r#"SELECT id, processing_status, weather_data
               FROM trips WHERE id = ? AND user_id = ?"#,
        )
        .bind(trip_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;

        let id: String = row.try_get("id")?;
        let packing_list = self.packing_list_for_trip(&id).await?;
        Ok(TripStatus {
            id,
            processing_status: parse_column(row.try_get("processing_status")?)?,
            weather_data: decode_weather(row.try_get("weather_data")?)?,
            packing_list,
        })
    }

    /// Single conditional update: status always, payload only when supplied.
    /// Store-level single-statement atomicity is the whole concurrency story;
    /// racing transitions are last-write-wins.
    pub async fn update_status(
        &self,
        user_id: i64,
        trip_id: &str,
        status: ProcessingStatus,
        weather_data: Option<&[WeatherDay]>,
    ) -> Result<Trip, AppError> {
        let payload = weather_data
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| AppError::Other(err.into()))?;

        let result = sqlx::query(
            r#"UPDATE trips
               SET processing_status = ?1,
                   weather_data = CASE WHEN ?2 IS NULL THEN weather_data ELSE ?2 END
               WHERE id = ?3 AND user_id = ?4"#,
        )
        .bind(status.as_str())
        .bind(&payload)
        .bind(trip_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        self.get_trip(user_id, trip_id).await
    }

    pub fn trip_types(&self) -> &'static [TripType] {
        &TripType::ALL
    }

    pub fn item_categories(&self) -> &'static [ItemCategory] {
        &ItemCategory::ALL
    }

    async fn packing_list_for_trip(
        &self,
        trip_id: &str,
    ) -> Result<Option<PackingListWithItems>, AppError> {
        let Some(row) = sqlx::query(
            r#"SELECT id, trip_id, created_at FROM packing_lists WHERE trip_id = ?"#,
        )
        .bind(trip_id)
        .fetch_optional(&self.db)
        .await?
        else {
            return Ok(None);
        };

        let list_id: String = row.try_get("id")?;
        let item_rows = sqlx::query(
            r#"SELECT id, packing_list_id, name, category, quantity, packed
               FROM packing_items WHERE packing_list_id = ?
               ORDER BY name"#,
        )
        .bind(&list_id)
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item in item_rows {
            items.push(PackingItem {
                id: item.try_get("id")?,
                packing_list_id: item.try_get("packing_list_id")?,
                name: item.try_get("name")?,
                category: parse_column(item.try_get("category")?)?,
                quantity: item.try_get("quantity")?,
                packed: item.try_get("packed")?,
            });
        }

        Ok(Some(PackingListWithItems {
            id: list_id,
            trip_id: row.try_get("trip_id")?,
            created_at: row.try_get("created_at")?,
            items,
        }))
    }
}

fn parse_column<T>(value: String) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(|err| AppError::Other(anyhow!("{err}")))
}

fn decode_weather(raw: Option<String>) -> Result<Option<Vec<WeatherDay>>, AppError> {
    raw.map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|err| AppError::Other(err.into()))
}

fn trip_from_row(row: &SqliteRow) -> Result<Trip, AppError> {
    Ok(Trip {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        destination: row.try_get("destination")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        duration: row.try_get("duration")?,
        trip_type: parse_column(row.try_get("trip_type")?)?,
        description: row.try_get("description")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        processing_status: parse_column(row.try_get("processing_status")?)?,
        weather_data: decode_weather(row.try_get("weather_data")?)?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_trip() -> NewTrip {
        NewTrip {
            title: "Summer in Paris".into(),
            destination: "Paris, France".into(),
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 5),
            trip_type: TripType::CityBreak,
            description: None,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn duration_is_whole_day_difference() {
        assert_eq!(trip_duration(date(2025, 6, 1), date(2025, 6, 5)), 4);
        assert_eq!(trip_duration(date(2025, 6, 1), date(2025, 6, 2)), 1);
        assert_eq!(trip_duration(date(2024, 12, 30), date(2025, 1, 2)), 3);
    }

    #[test]
    fn end_date_must_be_after_start_date() {
        let mut new = sample_trip();
        new.end_date = new.start_date;
        assert!(matches!(
            validate_new_trip(&new),
            Err(AppError::BadRequest(_))
        ));

        new.end_date = date(2025, 5, 28);
        assert!(matches!(
            validate_new_trip(&new),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn title_and_destination_are_required() {
        let mut new = sample_trip();
        new.title = "   ".into();
        assert!(validate_new_trip(&new).is_err());

        let mut new = sample_trip();
        new.destination = String::new();
        assert!(validate_new_trip(&new).is_err());
    }

    #[test]
    fn one_sided_coordinates_are_rejected() {
        let mut new = sample_trip();
        new.latitude = Some(48.85);
        assert!(validate_new_trip(&new).is_err());

        new.longitude = Some(2.35);
        assert!(validate_new_trip(&new).is_ok());
    }
}
