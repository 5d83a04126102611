use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use crate::errors::ConfigError;

#[derive(Deserialize)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
}

#[derive(Deserialize)]
pub struct Files {
    pub history_file: String,
    pub search_log_file: String,
    pub favorites_file: String,
}

#[derive(Deserialize)]
pub struct Backfill {
    #[serde(default = "default_top_limit")]
    pub top_searched_limit: usize,
    #[serde(default = "default_max_favorites")]
    pub max_favorites: usize,
    #[serde(default = "default_fallback_days")]
    pub fallback_days: i64,
    #[serde(default = "default_daily_run")]
    pub daily_run: (u32, u32),
}

#[derive(Deserialize)]
pub struct OpenWeatherApi {
    pub api_key: String,
    pub alternate_api_key: String,
}

#[derive(Deserialize)]
pub struct Config {
    pub general: General,
    pub files: Files,
    pub backfill: Backfill,
    pub open_weather: OpenWeatherApi,
}

fn default_top_limit() -> usize { 10 }

fn default_max_favorites() -> usize { 5 }

fn default_fallback_days() -> i64 { 7 }

fn default_daily_run() -> (u32, u32) { (1, 0) }

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {

    let toml = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&toml)?;

    if config.backfill.daily_run.0 > 23 || config.backfill.daily_run.1 > 59 {
        return Err(ConfigError::from("daily_run is not a valid hour/minute pair"));
    }
    if config.backfill.fallback_days < 1 {
        return Err(ConfigError::from("fallback_days must be at least 1"));
    }

    Ok(config)
}
