pub mod errors;

use std::time::Duration;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use crate::config::OpenWeatherApi;
use crate::errors::SourceError;
use crate::manager_open_weather::errors::OwmError;
use crate::models::open_weather_current::CurrentWeather;
use crate::sources::{Coordinates, CurrentSnapshot, CurrentSource};

const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Struct for managing live weather snapshots from OpenWeather
pub struct OpenWeather {
    client: Client,
    api_key: String,
    alternate_api_key: String,
}

impl OpenWeather {
    /// Returns an OpenWeather struct ready for fetching live snapshots
    ///
    /// # Arguments
    ///
    /// * 'config' - api keys for the OpenWeather account
    pub fn new(config: &OpenWeatherApi) -> Result<OpenWeather, OwmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(OpenWeather {
            client,
            api_key: config.api_key.to_string(),
            alternate_api_key: config.alternate_api_key.to_string(),
        })
    }

    /// Retrieves the current weather for a city by name.
    ///
    /// A 401 normally means the primary key has expired, so one more attempt
    /// is made with the alternate key before the failure is reported.
    ///
    /// # Arguments
    ///
    /// * 'city' - the city to get a snapshot for
    pub fn current_weather(&self, city: &str) -> Result<CurrentSnapshot, OwmError> {
        match self.current_query(city, &self.api_key)? {
            Some(snapshot) => Ok(snapshot),
            None => self.current_query(city, &self.alternate_api_key)?
                .ok_or(OwmError("request rejected with both api keys".to_string())),
        }
    }

    /// Returns Ok(None) on a 401 so the caller can switch keys
    fn current_query(&self, city: &str, api_key: &str) -> Result<Option<CurrentSnapshot>, OwmError> {
        let query = vec![
            ("q", city),
            ("appid", api_key),
            ("units", "metric"),
        ];

        let res = self.client
            .get(WEATHER_URL)
            .query(&query)
            .send()?;

        if res.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if res.status() != StatusCode::OK {
            return Err(OwmError(format!("http error: {}", res.status().to_string())));
        }

        let json = res.text()?;

        let current: CurrentWeather = serde_json::from_str(&json)?;

        Ok(Some(CurrentSnapshot {
            city: current.name,
            coord: Coordinates { lat: current.coord.lat, long: current.coord.lon },
            temp: current.main.temp,
        }))
    }
}

impl CurrentSource for OpenWeather {
    fn fetch_current(&self, city: &str) -> Result<CurrentSnapshot, SourceError> {
        Ok(self.current_weather(city)?)
    }
}
