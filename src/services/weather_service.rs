//! WeatherService sequences validation, the provider fetch, key
//! generation and the object-store write, and exposes the read paths.
//!
//! Holds no mutable state: both collaborators are shared handles created
//! once in `main` and cloned into every request.

use crate::{
    models::{
        stored::StoredObject,
        weather::{WeatherRecord, WeatherRequest},
    },
    services::{
        blob_store::{BlobStore, StorageError},
        filename,
        open_meteo::{WeatherError, WeatherProvider},
        validation::{self, ValidationError},
    },
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] WeatherError),
    #[error("file '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(StorageError),
    #[error("failed to serialize weather record: {0}")]
    Serialize(serde_json::Error),
    #[error("stored object is not a weather record: {0}")]
    Corrupt(serde_json::Error),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => ServiceError::NotFound(key),
            other => ServiceError::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn BlobStore>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: Arc<dyn BlobStore>) -> Self {
        Self { provider, store }
    }

    /// Label of the configured storage backend.
    pub fn storage_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Validate, fetch, then persist as one pretty-printed JSON object.
    ///
    /// Returns the generated key. Nothing is written unless the fetch
    /// fully succeeded.
    pub async fn store_weather(&self, request: &WeatherRequest) -> ServiceResult<String> {
        let query = validation::validate(request)?;

        let record = self.provider.fetch(&query).await?;

        let key = filename::generate(&query.coordinate, &query.range, Utc::now());
        let body = serde_json::to_vec_pretty(&record).map_err(ServiceError::Serialize)?;
        self.store
            .put(&key, Bytes::from(body), JSON_CONTENT_TYPE)
            .await?;

        info!("Successfully uploaded {}", key);
        Ok(key)
    }

    /// All stored objects, sorted by key. An empty namespace is `Ok(vec![])`.
    pub async fn list_stored(&self) -> ServiceResult<Vec<StoredObject>> {
        let objects = self.store.list().await?;
        info!("Listed {} weather files", objects.len());
        Ok(objects)
    }

    /// Read back a stored record. A missing key is `ServiceError::NotFound`.
    pub async fn get_stored(&self, key: &str) -> ServiceResult<WeatherRecord> {
        let body = self.store.get(key).await.inspect_err(|err| {
            if matches!(err, StorageError::NotFound(_)) {
                warn!("File not found: {}", key);
            }
        })?;
        let record = serde_json::from_slice(&body).map_err(ServiceError::Corrupt)?;
        info!("Retrieved file {}", key);
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        models::weather::{DailySeries, WeatherQuery},
        services::{cloud_store::CloudStore, validation::Reason},
    };
    use async_trait::async_trait;
    use object_store::memory::InMemory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub that answers every query with one row per day.
    #[derive(Default)]
    pub(crate) struct StubProvider {
        pub(crate) calls: AtomicUsize,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(WeatherError::Provider {
                    status: 429,
                    reason: "Daily API request limit exceeded".into(),
                });
            }

            let time: Vec<_> = query
                .range
                .start
                .iter_days()
                .take_while(|d| *d <= query.range.end)
                .collect();
            let values = |base: f64| -> Vec<Option<f64>> {
                (0..time.len()).map(|i| Some(base + i as f64)).collect()
            };
            Ok(WeatherRecord {
                latitude: query.coordinate.latitude,
                longitude: query.coordinate.longitude,
                elevation: 35.0,
                daily: DailySeries {
                    temperature_2m_max: values(10.0),
                    temperature_2m_min: values(1.0),
                    apparent_temperature_max: values(8.0),
                    apparent_temperature_min: values(-1.0),
                    time,
                },
            })
        }
    }

    pub(crate) fn service_with(
        provider: StubProvider,
    ) -> (WeatherService, Arc<StubProvider>, CloudStore) {
        let provider = Arc::new(provider);
        let store = CloudStore::new(Arc::new(InMemory::new()));
        let service = WeatherService::new(provider.clone(), Arc::new(store.clone()));
        (service, provider, store)
    }

    fn paris(start: &str, end: &str) -> WeatherRequest {
        WeatherRequest {
            latitude: 48.8566,
            longitude: 2.3522,
            start_date: start.into(),
            end_date: end.into(),
        }
    }

    #[tokio::test]
    async fn store_then_get_round_trips_aligned_series() {
        let (service, _, _) = service_with(StubProvider::default());

        let key = service.store_weather(&paris("2024-01-01", "2024-01-10")).await.unwrap();
        assert!(key.starts_with("weather_48_8566_2_3522_20240101_20240110_"));
        assert!(key.ends_with(".json"));

        let record = service.get_stored(&key).await.unwrap();
        assert_eq!(record.daily.time.len(), 10);
        assert_eq!(record.daily.misaligned_series(), None);
    }

    #[tokio::test]
    async fn stored_json_is_pretty_printed() {
        let (service, _, store) = service_with(StubProvider::default());
        let key = service.store_weather(&paris("2024-01-01", "2024-01-01")).await.unwrap();

        let raw = store.get(&key).await.unwrap();
        let text = std::str::from_utf8(&raw).unwrap();
        assert!(text.starts_with("{\n  \"latitude\""));
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_provider_or_store() {
        let (service, provider, store) = service_with(StubProvider::default());

        let err = service
            .store_weather(&paris("2024-01-01", "2024-02-15"))
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(e) => assert_eq!(e.reason, Reason::RangeTooLong),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_writes_nothing() {
        let (service, provider, store) = service_with(StubProvider {
            fail: true,
            ..Default::default()
        });

        let err = service
            .store_weather(&paris("2024-01-01", "2024-01-02"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_unknown_key_is_not_found() {
        let (service, _, _) = service_with(StubProvider::default());
        let err = service.get_stored("weather_never_stored.json").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref k) if k == "weather_never_stored.json"));
    }

    #[tokio::test]
    async fn get_non_record_object_is_corrupt() {
        let (service, _, store) = service_with(StubProvider::default());
        store
            .put("other.json", Bytes::from_static(b"{\"hello\":1}"), JSON_CONTENT_TYPE)
            .await
            .unwrap();

        let err = service.get_stored("other.json").await.unwrap_err();
        assert!(matches!(err, ServiceError::Corrupt(_)));
    }

    #[tokio::test]
    async fn list_reflects_stored_objects() {
        let (service, _, _) = service_with(StubProvider::default());
        assert!(service.list_stored().await.unwrap().is_empty());

        let key = service.store_weather(&paris("2024-03-01", "2024-03-05")).await.unwrap();
        let listed = service.list_stored().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, key);
        assert!(listed[0].size > 0);
    }
}
