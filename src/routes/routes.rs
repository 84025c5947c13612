//! Defines routes for the weather archive API.
//!
//! ## Structure
//! - **Weather endpoints**
//!   - `POST /store-weather-data` -> fetch a date range and persist it
//!   - `GET  /list-weather-files` -> list stored records
//!   - `GET  /weather-file-content/{filename}` -> read one stored record
//!
//! - **Diagnostics**
//!   - `GET /`       -> liveness
//!   - `GET /health` -> configured region, bucket and storage backend

use crate::{
    handlers::{
        health_handlers::{health, root},
        weather_handlers::{get_weather_file_content, list_weather_files, store_weather_data},
    },
    services::weather_service::WeatherService,
};
use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use std::sync::Arc;

/// Deployment details reported by `GET /health`.
#[derive(Debug, Clone)]
pub struct DeploymentInfo {
    pub region: String,
    pub bucket: String,
}

/// Shared state carried by the router.
#[derive(Clone)]
pub struct AppState {
    pub weather: WeatherService,
    pub deployment: Arc<DeploymentInfo>,
}

impl AppState {
    pub fn new(weather: WeatherService, deployment: DeploymentInfo) -> Self {
        Self {
            weather,
            deployment: Arc::new(deployment),
        }
    }
}

impl FromRef<AppState> for WeatherService {
    fn from_ref(state: &AppState) -> Self {
        state.weather.clone()
    }
}

/// Build the router for all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/store-weather-data", post(store_weather_data))
        .route("/list-weather-files", get(list_weather_files))
        .route(
            "/weather-file-content/{filename}",
            get(get_weather_file_content),
        )
}
