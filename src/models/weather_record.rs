use chrono::{NaiveDate, NaiveDateTime};

/// Marker written to the history file for numeric fields with no value
pub const NOT_AVAILABLE: &str = "N/A";

/// One city/date weather observation in canonical form.
///
/// The date is always a plain calendar date, it carries no time of day.
/// Upstream data may violate temp_min <= temp_mean <= temp_max so no such
/// ordering is assumed anywhere in the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub city: String,
    pub date: NaiveDate,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_mean: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: NaiveDateTime,
}

/// Rounds a temperature to 2 decimals, the precision kept in the history file
pub fn round_temp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds a coordinate to 4 decimals, the max precision the forecast APIs accept
pub fn round_coord(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}
