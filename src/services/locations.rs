use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::AppError;

/// Minimum query length before a lookup is attempted. Shorter queries
/// short-circuit to an empty result without touching the network.
pub const MIN_QUERY_LEN: usize = 2;

/// One geocoding match. Extra upstream fields are carried through opaquely;
/// only the coordinate pair is load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodingMatch {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub country: Option<String>,
    pub admin1: Option<String>,
    pub timezone: Option<String>,
}

/// The upstream omits `results` entirely when nothing matched; both spellings
/// decode to an empty list. An empty list is a valid answer, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<GeocodingMatch>,
}

#[derive(Clone)]
pub struct LocationClient {
    http: Client,
    base_url: String,
}

impl LocationClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Resolve a free-text place name to at most one best match.
    pub async fn search(&self, query: &str) -> Result<GeocodingResponse, AppError> {
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(GeocodingResponse::default());
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|err| AppError::Config(format!("invalid geocoding base url: {err}")))?;
        url.set_path("/v1/search");
        url.query_pairs_mut()
            .append_pair("name", query)
            .append_pair("count", "1");

        let response = self.http.get(url).send().await.map_err(|err| {
            warn!("geocoding request failed: {err}");
            AppError::LocationLookupFailed
        })?;

        if !response.status().is_success() {
            warn!("geocoding request returned {}", response.status());
            return Err(AppError::LocationLookupFailed);
        }

        response.json::<GeocodingResponse>().await.map_err(|err| {
            warn!("failed to decode geocoding response: {err}");
            AppError::LocationLookupFailed
        })
    }
}
