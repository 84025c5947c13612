//! Query value types and the persisted weather record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw body of `POST /store-weather-data`, before validation.
///
/// Dates are kept as text so that a malformed date is reported as a
/// field-level validation error instead of a generic JSON rejection.
#[derive(Deserialize, Clone, Debug)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: String,
    pub end_date: String,
}

/// A validated latitude/longitude pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    /// Degrees north, within `[-90, 90]`.
    pub latitude: f64,

    /// Degrees east, within `[-180, 180]`.
    pub longitude: f64,
}

/// An inclusive calendar-date range with `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Whole days between the two endpoints.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// A query that passed validation: the only input the provider ever sees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeatherQuery {
    pub coordinate: Coordinate,
    pub range: DateRange,
}

/// Daily weather statistics for a location, as stored in the object store.
///
/// The `daily` series are index-aligned with `daily.time`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeatherRecord {
    /// Latitude of the grid cell the provider resolved.
    pub latitude: f64,

    /// Longitude of the grid cell the provider resolved.
    pub longitude: f64,

    /// Elevation in metres used for the statistics.
    pub elevation: f64,

    pub daily: DailySeries,
}

/// Daily time series. `None` marks a day the provider has no value for.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DailySeries {
    pub time: Vec<NaiveDate>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub apparent_temperature_max: Vec<Option<f64>>,
    pub apparent_temperature_min: Vec<Option<f64>>,
}

impl DailySeries {
    /// Name of the first series whose length differs from `time`, if any.
    pub fn misaligned_series(&self) -> Option<&'static str> {
        let expected = self.time.len();
        [
            ("temperature_2m_max", self.temperature_2m_max.len()),
            ("temperature_2m_min", self.temperature_2m_min.len()),
            ("apparent_temperature_max", self.apparent_temperature_max.len()),
            ("apparent_temperature_min", self.apparent_temperature_min.len()),
        ]
        .into_iter()
        .find(|(_, len)| *len != expected)
        .map(|(name, _)| name)
    }
}
