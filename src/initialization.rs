use std::env;
use log::info;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use crate::config::{load_config, Config, General};
use crate::errors::InitError;
use crate::history::HistoryStore;
use crate::manager_open_meteo::OpenMeteo;
use crate::manager_open_weather::OpenWeather;

/// Bundle of source managers and the store used throughout a run
pub struct Mgr {
    pub meteo: OpenMeteo,
    pub weather: OpenWeather,
    pub store: HistoryStore,
}

/// Initializes configuration, logging and managers.
///
/// The configuration file location is taken from the BACKCAST_CONFIG
/// environment variable, with config.toml in the working directory as
/// default.
pub fn init() -> Result<(Config, Mgr), InitError> {
    let config_path = env::var("BACKCAST_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = load_config(&config_path)?;

    setup_logging(&config.general)?;

    // Print version
    info!("backcast version: {}", env!("CARGO_PKG_VERSION"));

    // Instantiate structs
    let meteo = OpenMeteo::new();
    let weather = OpenWeather::new(&config.open_weather)?;
    let store = HistoryStore::new(&config.files.history_file);

    Ok((config, Mgr { meteo, weather, store }))
}

/// Sets up the log4rs backend with a file appender and, when configured,
/// an additional stdout appender
///
/// # Arguments
///
/// * 'general' - the logging section of the configuration
fn setup_logging(general: &General) -> Result<(), InitError> {
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}")))
        .build(&general.log_path)
        .map_err(|e| InitError(format!("log file error: {}", e)))?;

    let mut builder = log4rs::Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} - {m}{n}")))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    let log_config = builder
        .build(root.build(general.log_level))
        .map_err(|e| InitError(format!("log configuration error: {}", e)))?;

    log4rs::init_config(log_config)
        .map_err(|e| InitError(format!("log init error: {}", e)))?;

    Ok(())
}
