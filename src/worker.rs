use std::thread;
use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike};
use log::{info, warn};
use crate::backfill::{detect_gap, run_backfill};
use crate::cities::build_city_set;
use crate::config::Config;
use crate::initialization::Mgr;
use crate::models::weather_record::NOT_AVAILABLE;
use crate::trend::{prepare_report, TrendClass};

/// Runs the pipeline once at startup and then once per day at the
/// configured trigger time.
///
/// The loop blocks on a coarse one minute tick. When the process starts
/// after today's trigger time the startup run counts for today, otherwise
/// the daily trigger still fires. Nothing in a run is fatal, a failed run
/// waits for the next trigger.
pub fn run(config: Config, mgr: &Mgr) {
    let mut local_now = Local::now();

    run_pipeline(&config, mgr, local_now);

    let mut day_of_year: Option<u32> = if past_trigger(local_now, config.backfill.daily_run) {
        Some(local_now.ordinal0())
    } else {
        None
    };

    loop {
        thread::sleep(std::time::Duration::from_secs(60));
        local_now = Local::now();

        if (day_of_year.is_none() || day_of_year.is_some_and(|d| d != local_now.ordinal0()))
            && past_trigger(local_now, config.backfill.daily_run) {
            run_pipeline(&config, mgr, local_now);
            day_of_year = Some(local_now.ordinal0());
        }
    }
}

/// Returns true once the clock has passed the daily trigger time
///
/// # Arguments
///
/// * 'date_time' - the current date and time
/// * 'trigger' - trigger time as an (hour, minute) pair
fn past_trigger(date_time: DateTime<Local>, trigger: (u32, u32)) -> bool {
    (date_time.hour(), date_time.minute()) >= trigger
}

/// One full pipeline run: build the city set, detect the gap, backfill it
/// and log a trend digest per city.
///
/// Every failure path inside a run degrades to fewer rows written or a
/// missing digest line, never to a crash.
///
/// # Arguments
///
/// * 'config' - the loaded configuration
/// * 'mgr' - source managers and the history store
/// * 'local_now' - the current date and time
fn run_pipeline(config: &Config, mgr: &Mgr, local_now: DateTime<Local>) {
    let today = local_now.date_naive();

    let cities = build_city_set(
        &config.files.search_log_file,
        &config.files.favorites_file,
        config.backfill.top_searched_limit,
        config.backfill.max_favorites,
    );
    if cities.is_empty() {
        info!("no cities to process");
        return;
    }

    match detect_gap(&mgr.store, today, config.backfill.fallback_days) {
        Some((from, to)) => {
            info!("backfilling {} cities for {} - {}", cities.len(), from, to);
            let summary = run_backfill(
                &mgr.meteo, &mgr.weather, &mgr.meteo, &mgr.store,
                &cities, from, to, today,
            );
            info!("backfill done: {} appended, {} skipped, {} failed",
                  summary.appended, summary.skipped, summary.failed);
        }
        None => {
            info!("history is up to date");
        }
    }

    trend_digest(mgr, &cities, today);
}

/// Logs a one line trend summary per city, built from the same report the
/// trend page consumes
///
/// # Arguments
///
/// * 'mgr' - source managers
/// * 'cities' - the city set of the finished run
/// * 'today' - the date the windows are anchored on
fn trend_digest(mgr: &Mgr, cities: &[String], today: NaiveDate) {
    for city in cities {
        match prepare_report(&mgr.meteo, city, today) {
            Ok(report) => {
                let today_slot = report.today_index;
                info!("{}: {} max {} ({}, {:+.2}) min {} ({}, {:+.2})",
                      report.city,
                      report.dates[today_slot],
                      fmt_slot(report.max_temps[today_slot]),
                      TrendClass::from_value(report.max_trends[today_slot]),
                      report.max_trends[today_slot],
                      fmt_slot(report.min_temps[today_slot]),
                      TrendClass::from_value(report.min_trends[today_slot]),
                      report.min_trends[today_slot]);
            }
            Err(e) => {
                warn!("no trend digest for {}: {}", city, e);
            }
        }
    }
}

fn fmt_slot(value: Option<f64>) -> String {
    value.map_or(NOT_AVAILABLE.to_string(), |t| format!("{:.1}", t))
}
