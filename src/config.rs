use std::{env, net::SocketAddr};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub geocoding_base_url: String,
    pub forecast_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://packwise.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-super-secret-packwise-cookie".to_string());

        let geocoding_base_url = env::var("GEOCODING_BASE_URL")
            .unwrap_or_else(|_| "https://geocoding-api.open-meteo.com".to_string());
        let forecast_base_url = env::var("FORECAST_BASE_URL")
            .unwrap_or_else(|_| "https://api.open-meteo.com".to_string());

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            geocoding_base_url,
            forecast_base_url,
        })
    }
}
