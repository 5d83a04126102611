use chrono::NaiveDate;
use crate::errors::SourceError;

/// A lat/long pair, kept at the 4 decimal precision the upstream APIs accept
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

/// Per-day aggregate answered by the archive for one past date
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_mean: Option<f64>,
}

/// Live "now" snapshot for a city, a single temperature plus its location
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSnapshot {
    pub city: String,
    pub coord: Coordinates,
    pub temp: Option<f64>,
}

/// One slot of a date-labelled forecast series
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReading {
    pub date: NaiveDate,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
}

/// Upstream answering point queries for arbitrary past calendar dates.
///
/// Implementations apply their own retry policy and fail explicitly when no
/// data exists for the date, they never hand back zeros.
pub trait HistoricalSource {
    fn fetch_historical(&self, coord: Coordinates, date: NaiveDate) -> Result<DailyAggregate, SourceError>;
}

/// Upstream answering "now" for a city. It cannot answer past dates.
pub trait CurrentSource {
    fn fetch_current(&self, city: &str) -> Result<CurrentSnapshot, SourceError>;
}

/// Upstream answering a short rolling forecast window around today
pub trait ForecastSource {
    fn fetch_forecast_window(&self, coord: Coordinates) -> Result<Vec<DailyReading>, SourceError>;
}

/// City name to coordinates, Ok(None) when the name is unknown
pub trait Geocoder {
    fn geocode(&self, city: &str) -> Result<Option<Coordinates>, SourceError>;
}
