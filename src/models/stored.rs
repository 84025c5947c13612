//! Represents an object already persisted in the object store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Metadata describing one stored weather record.
///
/// Owned by the object store; this service only ever reads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key (the generated filename).
    pub key: String,

    /// Size in bytes.
    pub size: u64,

    /// Timestamp when the object was written.
    pub last_modified: DateTime<Utc>,
}

/// Item of the `GET /list-weather-files` response.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WeatherFileMetadata {
    pub filename: String,
    pub size: u64,
    pub last_modified: String,
}

impl From<StoredObject> for WeatherFileMetadata {
    fn from(object: StoredObject) -> Self {
        Self {
            filename: object.key,
            size: object.size,
            last_modified: object
                .last_modified
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
