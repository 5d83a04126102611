use thiserror::Error;
use crate::manager_open_meteo::errors::MeteoError;
use crate::manager_open_weather::errors::OwmError;

#[derive(Error, Debug)]
#[error("error reading configuration: {0}")]
pub struct ConfigError(pub String);
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> ConfigError {
        ConfigError(format!("file error: {}", e))
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError(format!("toml document error: {}", e))
    }
}
impl From<&str> for ConfigError {
    fn from(e: &str) -> ConfigError {
        ConfigError(e.to_string())
    }
}

#[derive(Error, Debug)]
#[error("error in weather history store: {0}")]
pub struct StoreError(pub String);
impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> StoreError {
        StoreError(format!("file error: {}", e))
    }
}
impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> StoreError {
        StoreError(format!("csv error: {}", e))
    }
}

#[derive(Error, Debug)]
#[error("error from upstream weather source: {0}")]
pub struct SourceError(pub String);
impl From<MeteoError> for SourceError {
    fn from(e: MeteoError) -> SourceError {
        SourceError(e.to_string())
    }
}
impl From<OwmError> for SourceError {
    fn from(e: OwmError) -> SourceError {
        SourceError(e.to_string())
    }
}

#[derive(Error, Debug)]
#[error("error preparing temperature trend: {0}")]
pub struct TrendError(pub String);
impl From<SourceError> for TrendError {
    fn from(e: SourceError) -> TrendError {
        TrendError(e.to_string())
    }
}

#[derive(Error, Debug)]
#[error("BackcastInitError: {0}")]
pub struct InitError(pub String);
impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> InitError {
        InitError(e.to_string())
    }
}
impl From<OwmError> for InitError {
    fn from(e: OwmError) -> InitError {
        InitError(e.to_string())
    }
}
