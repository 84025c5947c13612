//! Request validation for weather queries.
//!
//! Checks run in a fixed order so that a request with several problems
//! always reports the same one: latitude, longitude, date formats, date
//! ordering, then range length. Validation is pure and runs before any
//! external call.

use crate::models::weather::{Coordinate, DateRange, WeatherQuery, WeatherRequest};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Longest allowed distance between `start_date` and `end_date`, in days.
pub const MAX_RANGE_DAYS: i64 = 31;

const ISO_DATE_LEN: usize = "YYYY-MM-DD".len();

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    OutOfRange,
    BadFormat,
    BeforeStartDate,
    RangeTooLong,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Reason::OutOfRange => "out of range",
            Reason::BadFormat => "bad format",
            Reason::BeforeStartDate => "before start_date",
            Reason::RangeTooLong => "range exceeds 31 days",
        };
        f.write_str(text)
    }
}

/// A client-caused rejection naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: Reason,
}

impl ValidationError {
    fn new(field: &'static str, reason: Reason) -> Self {
        Self { field, reason }
    }
}

/// Validate a raw request into a [`WeatherQuery`].
pub fn validate(request: &WeatherRequest) -> Result<WeatherQuery, ValidationError> {
    let coordinate = validate_coordinate(request.latitude, request.longitude)?;
    let range = validate_range(&request.start_date, &request.end_date)?;
    Ok(WeatherQuery { coordinate, range })
}

/// Check latitude is in `[-90, 90]` and longitude in `[-180, 180]`.
///
/// NaN fails both checks.
pub fn validate_coordinate(latitude: f64, longitude: f64) -> Result<Coordinate, ValidationError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::new("latitude", Reason::OutOfRange));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::new("longitude", Reason::OutOfRange));
    }
    Ok(Coordinate {
        latitude,
        longitude,
    })
}

/// Parse both dates and check ordering and span.
pub fn validate_range(start_date: &str, end_date: &str) -> Result<DateRange, ValidationError> {
    let start = parse_iso_date(start_date)
        .ok_or_else(|| ValidationError::new("start_date", Reason::BadFormat))?;
    let end = parse_iso_date(end_date)
        .ok_or_else(|| ValidationError::new("end_date", Reason::BadFormat))?;

    if start > end {
        return Err(ValidationError::new("end_date", Reason::BeforeStartDate));
    }

    let range = DateRange { start, end };
    if range.span_days() > MAX_RANGE_DAYS {
        return Err(ValidationError::new("end_date", Reason::RangeTooLong));
    }

    Ok(range)
}

/// Strict `YYYY-MM-DD`. Times, offsets and unpadded fields are rejected.
fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if value.len() != ISO_DATE_LEN {
        return None;
    }
    let bytes = value.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
