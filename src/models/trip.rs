use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    Business,
    Leisure,
    Adventure,
    Beach,
    CityBreak,
    Camping,
    Cruise,
    Backpacking,
    Family,
    Romantic,
    Other,
}

impl TripType {
    pub const ALL: [TripType; 11] = [
        TripType::Business,
        TripType::Leisure,
        TripType::Adventure,
        TripType::Beach,
        TripType::CityBreak,
        TripType::Camping,
        TripType::Cruise,
        TripType::Backpacking,
        TripType::Family,
        TripType::Romantic,
        TripType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Business => "BUSINESS",
            TripType::Leisure => "LEISURE",
            TripType::Adventure => "ADVENTURE",
            TripType::Beach => "BEACH",
            TripType::CityBreak => "CITY_BREAK",
            TripType::Camping => "CAMPING",
            TripType::Cruise => "CRUISE",
            TripType::Backpacking => "BACKPACKING",
            TripType::Family => "FAMILY",
            TripType::Romantic => "ROMANTIC",
            TripType::Other => "OTHER",
        }
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TripType::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| format!("unknown trip type: {value}"))
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle marker for the background weather enrichment of a trip.
///
/// `Pending` is the schema default at creation; the enrichment flow moves a
/// trip to `Processing` and then to `Completed` or `Failed`. A retry simply
/// re-enters `Processing` via the same transition operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub const ALL: [ProcessingStatus; 4] = [
        ProcessingStatus::Pending,
        ProcessingStatus::Processing,
        ProcessingStatus::Completed,
        ProcessingStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProcessingStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| format!("unknown processing status: {value}"))
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Clothing,
    Toiletries,
    Electronics,
    Documents,
    Medication,
    Accessories,
    Footwear,
    Equipment,
    Essentials,
    Misc,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 10] = [
        ItemCategory::Clothing,
        ItemCategory::Toiletries,
        ItemCategory::Electronics,
        ItemCategory::Documents,
        ItemCategory::Medication,
        ItemCategory::Accessories,
        ItemCategory::Footwear,
        ItemCategory::Equipment,
        ItemCategory::Essentials,
        ItemCategory::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Clothing => "CLOTHING",
            ItemCategory::Toiletries => "TOILETRIES",
            ItemCategory::Electronics => "ELECTRONICS",
            ItemCategory::Documents => "DOCUMENTS",
            ItemCategory::Medication => "MEDICATION",
            ItemCategory::Accessories => "ACCESSORIES",
            ItemCategory::Footwear => "FOOTWEAR",
            ItemCategory::Equipment => "EQUIPMENT",
            ItemCategory::Essentials => "ESSENTIALS",
            ItemCategory::Misc => "MISC",
        }
    }
}

impl FromStr for ItemCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ItemCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| format!("unknown item category: {value}"))
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One forecast day, in the upstream API's native units.
///
/// Field names follow the upstream-facing payload stored on the trip row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherDay {
    pub day: NaiveDate,
    #[serde(rename = "maxTemp")]
    pub max_temp: f64,
    #[serde(rename = "lowTemp")]
    pub low_temp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub user_id: i64,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i64,
    pub trip_type: TripType,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub processing_status: ProcessingStatus,
    pub weather_data: Option<Vec<WeatherDay>>,
    pub created_at: DateTime<Utc>,
}

/// List projection: everything a trip card needs, minus the weather payload.
#[derive(Debug, Clone, Serialize)]
pub struct TripSummary {
    pub id: String,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i64,
    pub trip_type: TripType,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub packing_list: Option<PackingListWithItems>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingItem {
    pub id: String,
    pub packing_list_id: String,
    pub name: String,
    pub category: ItemCategory,
    pub quantity: i64,
    pub packed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackingListWithItems {
    pub id: String,
    pub trip_id: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<PackingItem>,
}

/// Enrichment-facing view of a trip: status, stored forecast, and the
/// linked packing list.
#[derive(Debug, Clone, Serialize)]
pub struct TripStatus {
    pub id: String,
    pub processing_status: ProcessingStatus,
    pub weather_data: Option<Vec<WeatherDay>>,
    pub packing_list: Option<PackingListWithItems>,
}
