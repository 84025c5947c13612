use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, fmt::Display, str::FromStr, time::Duration};

use crate::services::open_meteo::{DEFAULT_BASE_URL, WeatherClientConfig};

/// Where stored weather records live.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3 bucket via `object_store`.
    S3,
    /// Local disk + SQLite, for development.
    Local,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub storage_backend: StorageBackend,
    pub region: String,
    pub bucket: String,
    pub storage_dir: String,
    pub database_url: String,
    pub open_meteo_url: String,
    pub weather_timeout_secs: u64,
    pub weather_max_retries: u32,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Historical weather fetch-and-archive API")]
pub struct Args {
    /// Host to bind to (overrides WEATHER_API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides WEATHER_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Comma-separated CORS origins (overrides ALLOWED_ORIGINS)
    #[arg(long)]
    pub allowed_origins: Option<String>,

    /// Storage backend (overrides STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// Cloud region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Bucket name (overrides S3_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Directory for local object payloads (overrides LOCAL_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// SQLite URL for local metadata (overrides DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Open-Meteo archive endpoint (overrides OPEN_METEO_BASE_URL)
    #[arg(long)]
    pub open_meteo_url: Option<String>,

    /// Per-attempt provider timeout in seconds (overrides WEATHER_TIMEOUT_SECS)
    #[arg(long)]
    pub weather_timeout_secs: Option<u64>,

    /// Provider retries on transient failures (overrides WEATHER_MAX_RETRIES)
    #[arg(long)]
    pub weather_max_retries: Option<u32>,

    /// Prepare the local storage schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge `args` over the variables visible through `lookup` over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let storage_backend = match args.storage_backend {
            Some(backend) => backend,
            None => match lookup("STORAGE_BACKEND") {
                Some(value) => <StorageBackend as ValueEnum>::from_str(&value, true)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("parsing STORAGE_BACKEND value `{}`", value))?,
                None => StorageBackend::S3,
            },
        };

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| text("WEATHER_API_HOST", "0.0.0.0")),
            port: match args.port {
                Some(port) => port,
                None => parse_var(&lookup, "WEATHER_API_PORT", 8000)?,
            },
            allowed_origins: args
                .allowed_origins
                .unwrap_or_else(|| text("ALLOWED_ORIGINS", "http://localhost:5173")),
            storage_backend,
            region: args.region.unwrap_or_else(|| text("AWS_REGION", "us-east-1")),
            bucket: args
                .bucket
                .unwrap_or_else(|| text("S3_BUCKET", "weather-explorer-data")),
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| text("LOCAL_STORAGE_DIR", "./data/objects")),
            database_url: args.database_url.unwrap_or_else(|| {
                text("DATABASE_URL", "sqlite://./data/meta/weather_archive.db")
            }),
            open_meteo_url: args
                .open_meteo_url
                .unwrap_or_else(|| text("OPEN_METEO_BASE_URL", DEFAULT_BASE_URL)),
            weather_timeout_secs: match args.weather_timeout_secs {
                Some(secs) => secs,
                None => parse_var(&lookup, "WEATHER_TIMEOUT_SECS", 30)?,
            },
            weather_max_retries: match args.weather_max_retries {
                Some(retries) => retries,
                None => parse_var(&lookup, "WEATHER_MAX_RETRIES", 5)?,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Trimmed, non-empty entries of `allowed_origins`.
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn weather_client(&self) -> WeatherClientConfig {
        WeatherClientConfig {
            base_url: self.open_meteo_url.clone(),
            timeout: Duration::from_secs(self.weather_timeout_secs),
            max_retries: self.weather_max_retries,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}
