use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::AppError;
use crate::models::trip::WeatherDay;

/// Daily forecast response from the upstream API. The three arrays are
/// parallel and index-aligned per the upstream contract.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyData,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    time: Vec<NaiveDate>,
    #[serde(rename = "temperature_2m_max")]
    temperature_max: Vec<f64>,
    #[serde(rename = "temperature_2m_min")]
    temperature_min: Vec<f64>,
}

fn daily_to_days(daily: DailyData) -> Vec<WeatherDay> {
    daily
        .time
        .into_iter()
        .zip(daily.temperature_max)
        .zip(daily.temperature_min)
        .map(|((day, max_temp), low_temp)| WeatherDay {
            day,
            max_temp,
            low_temp,
        })
        .collect()
}

#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Fetch one min/max entry per calendar day in the inclusive range, in
    /// ascending date order, in the upstream's native units. The caller
    /// guarantees `start <= end`.
    pub async fn daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeatherDay>, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| AppError::Config(format!("invalid forecast base url: {err}")))?;
        url.set_path("/v1/forecast");
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("daily", "temperature_2m_max,temperature_2m_min")
            .append_pair("start_date", &start.format("%Y-%m-%d").to_string())
            .append_pair("end_date", &end.format("%Y-%m-%d").to_string())
            .append_pair("timezone", "auto");

        let response = self.http.get(url).send().await.map_err(|err| {
            warn!("forecast request failed: {err}");
            AppError::WeatherFetchFailed
        })?;

        if !response.status().is_success() {
            warn!("forecast request returned {}", response.status());
            return Err(AppError::WeatherFetchFailed);
        }

        let forecast = response.json::<ForecastResponse>().await.map_err(|err| {
            warn!("failed to decode forecast response: {err}");
            AppError::WeatherFetchFailed
        })?;

        Ok(daily_to_days(forecast.daily))
    }
}
