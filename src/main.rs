use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use config::{AppConfig, StorageBackend};
use routes::routes::{AppState, DeploymentInfo};
use services::{
    blob_store::BlobStore, cloud_store::CloudStore, local_store::LocalStore,
    open_meteo::OpenMeteoClient, weather_service::WeatherService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting weather-archive with config: {:?}", cfg);

    // --- Handle migration mode ---
    if migrate {
        let local = LocalStore::connect(&cfg.database_url, &cfg.storage_dir)
            .await
            .context("opening local storage")?;
        local.migrate().await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize collaborators ---
    let store = build_store(&cfg).await?;
    let provider = OpenMeteoClient::new(cfg.weather_client())
        .context("building Open-Meteo client")?;
    tracing::info!(
        "Using {} storage, provider {} (timeout {}s, {} retries)",
        store.backend(),
        cfg.open_meteo_url,
        cfg.weather_timeout_secs,
        cfg.weather_max_retries
    );

    let weather = WeatherService::new(Arc::new(provider), store);
    let state = AppState::new(
        weather,
        DeploymentInfo {
            region: cfg.region.clone(),
            bucket: cfg.bucket.clone(),
        },
    );

    // --- Build router ---
    let app: Router = routes::routes::routes()
        .with_state(state)
        .layer(cors_layer(&cfg)?)
        .layer(TraceLayer::new_for_http());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Construct the configured object store. Lives for the whole process.
async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn BlobStore>> {
    match cfg.storage_backend {
        StorageBackend::S3 => {
            let store = CloudStore::s3(&cfg.bucket, &cfg.region)
                .with_context(|| format!("configuring S3 bucket `{}`", cfg.bucket))?;
            tracing::info!("Initialized S3 storage with bucket: {}", cfg.bucket);
            Ok(Arc::new(store))
        }
        StorageBackend::Local => {
            let store = LocalStore::connect(&cfg.database_url, &cfg.storage_dir)
                .await
                .context("opening local storage")?;
            store.migrate().await?;
            tracing::info!("Initialized local storage at {}", cfg.storage_dir);
            Ok(Arc::new(store))
        }
    }
}

/// CORS for the configured origins, with credentials and mirrored
/// methods/headers. A `*` entry allows any origin by echoing it back.
fn cors_layer(cfg: &AppConfig) -> Result<CorsLayer> {
    let origins = cfg.origins();
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin `{}`", origin))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}
