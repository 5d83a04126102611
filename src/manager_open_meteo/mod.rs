pub mod errors;

use std::time::Duration;
use chrono::NaiveDate;
use ureq::Agent;
use crate::errors::SourceError;
use crate::manager_open_meteo::errors::MeteoError;
use crate::models::open_meteo_archive::ArchiveResponse;
use crate::models::open_meteo_forecast::ForecastResponse;
use crate::models::open_meteo_geocoding::GeocodingResponse;
use crate::retry;
use crate::sources::{Coordinates, DailyAggregate, DailyReading, ForecastSource, Geocoder, HistoricalSource};

const ARCHIVE_DOMAIN: &str = "https://archive-api.open-meteo.com";
const FORECAST_DOMAIN: &str = "https://api.open-meteo.com";
const GEOCODING_DOMAIN: &str = "https://geocoding-api.open-meteo.com";

/// Days before today included in the forecast window
const WINDOW_PAST_DAYS: u32 = 5;

/// Forecast days counted from today inclusive, i.e. today plus seven ahead
const WINDOW_FORECAST_DAYS: u32 = 8;

/// Struct for managing archive, forecast and geocoding lookups against Open-Meteo
pub struct OpenMeteo {
    agent: Agent,
}

impl OpenMeteo {
    /// Returns an OpenMeteo struct ready for fetching weather data.
    ///
    /// Lat/long values are truncated to 4 decimals in every request since that
    /// is the max precision Open-Meteo accepts.
    pub fn new() -> OpenMeteo {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = config.into();

        Self { agent }
    }

    /// Retrieves the archived daily aggregate for one past date.
    ///
    /// The archive is the only upstream that answers arbitrary past dates, so
    /// transient failures are retried with backoff before giving up. A date
    /// the archive has no row for is reported as an error, never as zeros.
    ///
    /// # Arguments
    ///
    /// * 'coord' - the point to get archive data for
    /// * 'date' - the past calendar date to query
    pub fn daily_archive(&self, coord: Coordinates, date: NaiveDate) -> Result<DailyAggregate, MeteoError> {
        retry!(|| self.archive_query(coord, date))
    }

    fn archive_query(&self, coord: Coordinates, date: NaiveDate) -> Result<DailyAggregate, MeteoError> {
        let url = format!(
            "{}/v1/archive?latitude={:0.4}&longitude={:0.4}&start_date={}&end_date={}&daily=temperature_2m_max,temperature_2m_min,temperature_2m_mean",
            ARCHIVE_DOMAIN, coord.lat, coord.long, date, date);

        let json = self.agent
            .get(url)
            .call()?
            .body_mut()
            .read_to_string()?;

        let archive: ArchiveResponse = serde_json::from_str(&json)?;

        let daily = archive.daily;
        if daily.time.is_empty() {
            return Err(MeteoError(format!("no archive data for {}", date)));
        }

        Ok(DailyAggregate {
            temp_max: daily.temperature_2m_max.first().copied().flatten(),
            temp_min: daily.temperature_2m_min.first().copied().flatten(),
            temp_mean: daily.temperature_2m_mean.first().copied().flatten(),
        })
    }

    /// Retrieves the 13 slot daily max/min series around today, five past
    /// days plus today plus seven forecast days, in one combined query.
    ///
    /// # Arguments
    ///
    /// * 'coord' - the point to get the forecast window for
    pub fn forecast_window(&self, coord: Coordinates) -> Result<Vec<DailyReading>, MeteoError> {
        retry!(|| self.forecast_query(coord))
    }

    fn forecast_query(&self, coord: Coordinates) -> Result<Vec<DailyReading>, MeteoError> {
        let url = format!(
            "{}/v1/forecast?latitude={:0.4}&longitude={:0.4}&past_days={}&forecast_days={}&daily=temperature_2m_max,temperature_2m_min&timezone=auto",
            FORECAST_DOMAIN, coord.lat, coord.long, WINDOW_PAST_DAYS, WINDOW_FORECAST_DAYS);

        let json = self.agent
            .get(url)
            .call()?
            .body_mut()
            .read_to_string()?;

        let forecast: ForecastResponse = serde_json::from_str(&json)?;

        let daily = forecast.daily;
        let readings = daily.time
            .iter()
            .enumerate()
            .map(|(i, date)| DailyReading {
                date: *date,
                temp_max: daily.temperature_2m_max.get(i).copied().flatten(),
                temp_min: daily.temperature_2m_min.get(i).copied().flatten(),
            })
            .collect();

        Ok(readings)
    }

    /// Looks a city name up in the geocoding index and returns the best
    /// match, or Ok(None) when the name is unknown
    ///
    /// # Arguments
    ///
    /// * 'city' - the city name to search for
    pub fn search_city(&self, city: &str) -> Result<Option<Coordinates>, MeteoError> {
        let json = self.agent
            .get(format!("{}/v1/search", GEOCODING_DOMAIN))
            .query("name", city)
            .query("count", "1")
            .query("language", "en")
            .query("format", "json")
            .call()?
            .body_mut()
            .read_to_string()?;

        let geocoding: GeocodingResponse = serde_json::from_str(&json)?;

        let best = geocoding.results
            .and_then(|r| r.into_iter().next())
            .map(|m| Coordinates { lat: m.latitude, long: m.longitude });

        Ok(best)
    }
}

impl HistoricalSource for OpenMeteo {
    fn fetch_historical(&self, coord: Coordinates, date: NaiveDate) -> Result<DailyAggregate, SourceError> {
        Ok(self.daily_archive(coord, date)?)
    }
}

impl ForecastSource for OpenMeteo {
    fn fetch_forecast_window(&self, coord: Coordinates) -> Result<Vec<DailyReading>, SourceError> {
        Ok(self.forecast_window(coord)?)
    }
}

impl Geocoder for OpenMeteo {
    fn geocode(&self, city: &str) -> Result<Option<Coordinates>, SourceError> {
        Ok(self.search_city(city)?)
    }
}
