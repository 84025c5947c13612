//! Open-Meteo historical weather client.
//!
//! One `GET` against the archive API per query. Transient failures
//! (connect errors, 408, 429, 5xx) are retried by `reqwest-retry` with
//! exponential backoff; every attempt is bounded by the configured timeout.

use crate::models::weather::{DailySeries, DateRange, WeatherQuery, WeatherRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Daily variables requested from the provider, in response order.
pub const DAILY_VARIABLES: [&str; 4] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "apparent_temperature_max",
    "apparent_temperature_min",
];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_MIN_INTERVAL: Duration = Duration::from_millis(200);
const RETRY_MAX_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),

    #[error("weather provider unreachable: {0}")]
    Transport(String),

    #[error("weather provider returned HTTP {status}: {reason}")]
    Provider { status: u16, reason: String },

    #[error("malformed weather provider response: {0}")]
    MalformedResponse(String),
}

/// Source of historical daily weather statistics.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Daily statistics for `query.coordinate` covering `query.range`.
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherClientConfig {
    /// Archive endpoint, e.g. `https://archive-api.open-meteo.com/v1/archive`.
    pub base_url: String,

    /// Per-attempt request timeout.
    pub timeout: Duration,

    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 5,
        }
    }
}

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: Url,
}

impl OpenMeteoClient {
    pub fn new(config: WeatherClientConfig) -> Result<Self, WeatherError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| WeatherError::InvalidUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .build()
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(RETRY_MIN_INTERVAL, RETRY_MAX_INTERVAL)
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, base_url })
    }

    fn archive_url(&self, query: &WeatherQuery) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &query.coordinate.latitude.to_string())
            .append_pair("longitude", &query.coordinate.longitude.to_string())
            .append_pair("start_date", &query.range.start.to_string())
            .append_pair("end_date", &query.range.end.to_string())
            .append_pair("daily", &DAILY_VARIABLES.join(","))
            .append_pair("timezone", "auto");
        url
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    #[instrument(skip(self, query), fields(
        lat = %query.coordinate.latitude,
        lon = %query.coordinate.longitude,
        start = %query.range.start,
        end = %query.range.end
    ))]
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, WeatherError> {
        let url = self.archive_url(query);
        info!("Fetching weather data");
        debug!(url = %url, "archive request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ProviderErrorBody>(&body)
                .map(|b| b.reason)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                reason,
            });
        }

        let archive: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;

        let record = archive.into_record(&query.range)?;
        info!(days = record.daily.time.len(), "Successfully fetched weather data");
        Ok(record)
    }
}

/// Error body Open-Meteo sends with 4xx responses.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    elevation: f64,
    daily: Option<ArchiveDaily>,
}

#[derive(Debug, Deserialize)]
struct ArchiveDaily {
    time: Vec<NaiveDate>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    apparent_temperature_max: Vec<Option<f64>>,
    #[serde(default)]
    apparent_temperature_min: Vec<Option<f64>>,
}

impl ArchiveResponse {
    /// Reshape into a [`WeatherRecord`] whose `time` is exactly
    /// `range.start..=range.end` in daily steps.
    fn into_record(self, range: &DateRange) -> Result<WeatherRecord, WeatherError> {
        let daily = self
            .daily
            .ok_or_else(|| WeatherError::MalformedResponse("no daily data".into()))?;

        let daily = DailySeries {
            time: daily.time,
            temperature_2m_max: daily.temperature_2m_max,
            temperature_2m_min: daily.temperature_2m_min,
            apparent_temperature_max: daily.apparent_temperature_max,
            apparent_temperature_min: daily.apparent_temperature_min,
        };
        if let Some(series) = daily.misaligned_series() {
            return Err(WeatherError::MalformedResponse(format!(
                "{series} length differs from time"
            )));
        }
        if daily.time.first() != Some(&range.start) || daily.time.last() != Some(&range.end) {
            return Err(WeatherError::MalformedResponse(format!(
                "daily time does not span {} to {}",
                range.start, range.end
            )));
        }
        if daily.time.windows(2).any(|w| (w[1] - w[0]).num_days() != 1) {
            return Err(WeatherError::MalformedResponse(
                "daily time is not in one-day steps".into(),
            ));
        }

        Ok(WeatherRecord {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
            daily,
        })
    }
}
