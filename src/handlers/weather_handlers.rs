//! HTTP handlers for storing and reading back weather records.
//! All work is delegated to `WeatherService`; handlers only translate
//! between JSON and service calls.

use crate::{
    errors::AppError,
    models::{
        stored::WeatherFileMetadata,
        weather::{WeatherRecord, WeatherRequest},
    },
    services::weather_service::WeatherService,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct StoreWeatherResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
}

/// `POST /store-weather-data`: fetch from the provider and persist.
pub async fn store_weather_data(
    State(service): State<WeatherService>,
    payload: Result<Json<WeatherRequest>, JsonRejection>,
) -> Result<Json<StoreWeatherResponse>, AppError> {
    let Json(request) = payload?;

    let filename = service.store_weather(&request).await.map_err(|err| {
        error!("Error storing weather data: {}", err);
        AppError::from_service(err, "Failed to store weather data")
    })?;

    Ok(Json(StoreWeatherResponse {
        success: true,
        message: "Weather data successfully stored".into(),
        filename,
    }))
}

/// `GET /list-weather-files`: metadata of every stored record.
pub async fn list_weather_files(
    State(service): State<WeatherService>,
) -> Result<Json<Vec<WeatherFileMetadata>>, AppError> {
    let objects = service.list_stored().await.map_err(|err| {
        error!("Error listing weather files: {}", err);
        AppError::from_service(err, "Failed to list weather files")
    })?;

    Ok(Json(
        objects.into_iter().map(WeatherFileMetadata::from).collect(),
    ))
}

/// `GET /weather-file-content/{filename}`: one stored record.
pub async fn get_weather_file_content(
    State(service): State<WeatherService>,
    Path(filename): Path<String>,
) -> Result<Json<WeatherRecord>, AppError> {
    let record = service.get_stored(&filename).await.map_err(|err| {
        error!("Error retrieving file content: {}", err);
        AppError::from_service(err, "Failed to retrieve file content")
    })?;

    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use crate::{
        routes::routes::{AppState, DeploymentInfo, routes},
        services::weather_service::tests::{StubProvider, service_with},
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(provider: StubProvider) -> Router {
        let (service, _, _) = service_with(provider);
        routes().with_state(AppState::new(
            service,
            DeploymentInfo {
                region: "us-east-1".into(),
                bucket: "weather-test".into(),
            },
        ))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_store(body: Value) -> Request<Body> {
        Request::post("/store-weather-data")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn store_list_and_fetch() {
        let app = app(StubProvider::default());

        let (status, body) = send(
            &app,
            post_store(json!({
                "latitude": -33.8688,
                "longitude": 151.2093,
                "start_date": "2024-01-01",
                "end_date": "2024-01-07"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Weather data successfully stored");
        let filename = body["filename"].as_str().unwrap().to_string();
        assert!(filename.starts_with("weather_n33_8688_151_2093_20240101_20240107_"));

        let (status, list) = send(&app, get("/list-weather-files")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["filename"], filename.as_str());
        assert!(list[0]["size"].as_u64().unwrap() > 0);
        assert!(list[0]["last_modified"].is_string());

        let (status, content) =
            send(&app, get(&format!("/weather-file-content/{filename}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content["daily"]["time"].as_array().unwrap().len(), 7);
        assert_eq!(content["daily"]["time"][0], "2024-01-01");
    }

    #[tokio::test]
    async fn invalid_request_is_422_with_field() {
        let app = app(StubProvider::default());

        let (status, body) = send(
            &app,
            post_store(json!({
                "latitude": 91.0,
                "longitude": 0.0,
                "start_date": "2024-01-01",
                "end_date": "2024-01-02"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], json!(["body", "latitude"]));
        assert_eq!(body["detail"][0]["msg"], "out of range");

        let (status, body) = send(
            &app,
            post_store(json!({
                "latitude": 0.0,
                "longitude": 0.0,
                "start_date": "2024-01-10",
                "end_date": "2024-01-05"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"][1], "end_date");
    }

    #[tokio::test]
    async fn missing_fields_are_422() {
        let app = app(StubProvider::default());
        let (status, body) = send(&app, post_store(json!({ "latitude": 1.0 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn provider_failure_is_500_with_reason() {
        let app = app(StubProvider {
            fail: true,
            ..Default::default()
        });

        let (status, body) = send(
            &app,
            post_store(json!({
                "latitude": 0.0,
                "longitude": 0.0,
                "start_date": "2024-01-01",
                "end_date": "2024-01-02"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Failed to store weather data: "));
        assert!(detail.contains("Daily API request limit exceeded"));
    }

    #[tokio::test]
    async fn unknown_file_is_404() {
        let app = app(StubProvider::default());
        let (status, body) = send(&app, get("/weather-file-content/missing.json")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "File 'missing.json' not found");
    }

    #[tokio::test]
    async fn empty_listing_is_empty_array() {
        let app = app(StubProvider::default());
        let (status, body) = send(&app, get("/list-weather-files")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
