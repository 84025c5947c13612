//! Object key generation.
//!
//! Keys look like `weather_{lat}_{lon}_{start}_{end}_{ts}.json`. Two calls
//! for the same query within the same UTC second yield the same key.

use crate::models::weather::{Coordinate, DateRange};
use chrono::{DateTime, Utc};

/// Build the storage key for a validated query written at `now`.
pub fn generate(coordinate: &Coordinate, range: &DateRange, now: DateTime<Utc>) -> String {
    format!(
        "weather_{}_{}_{}_{}_{}.json",
        encode_degrees(coordinate.latitude),
        encode_degrees(coordinate.longitude),
        range.start.format("%Y%m%d"),
        range.end.format("%Y%m%d"),
        now.format("%Y%m%d_%H%M%S"),
    )
}

/// `-12.34` -> `n12_3400`.
fn encode_degrees(value: f64) -> String {
    format!("{value:.4}").replace('.', "_").replace('-', "n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn range(start: &str, end: &str) -> DateRange {
        DateRange {
            start: NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            end: NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn formats_positive_coordinates() {
        let coordinate = Coordinate {
            latitude: 48.8566,
            longitude: 2.3522,
        };
        let key = generate(&coordinate, &range("2024-01-01", "2024-01-10"), noon());
        assert_eq!(key, "weather_48_8566_2_3522_20240101_20240110_20240601_120000.json");
    }

    #[test]
    fn prefixes_negative_coordinates_with_n() {
        let coordinate = Coordinate {
            latitude: -48.8566,
            longitude: -12.34,
        };
        let key = generate(&coordinate, &range("2024-01-01", "2024-01-10"), noon());
        assert_eq!(key, "weather_n48_8566_n12_3400_20240101_20240110_20240601_120000.json");
    }

    #[test]
    fn rounds_to_four_decimals() {
        assert_eq!(encode_degrees(0.0), "0_0000");
        assert_eq!(encode_degrees(179.99999), "180_0000");
        assert_eq!(encode_degrees(-90.0), "n90_0000");
    }

    #[test]
    fn is_deterministic_for_identical_inputs() {
        let coordinate = Coordinate {
            latitude: 1.5,
            longitude: 2.5,
        };
        let r = range("2023-12-31", "2024-01-31");
        assert_eq!(generate(&coordinate, &r, noon()), generate(&coordinate, &r, noon()));
    }

    #[test]
    fn timestamp_has_second_resolution() {
        let coordinate = Coordinate {
            latitude: 1.0,
            longitude: 1.0,
        };
        let r = range("2024-01-01", "2024-01-01");
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 1).unwrap();
        assert_ne!(generate(&coordinate, &r, noon()), generate(&coordinate, &r, later));
        assert!(generate(&coordinate, &r, later).ends_with("_20240601_120001.json"));
    }
}
