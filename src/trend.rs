use std::fmt;
use chrono::NaiveDate;
use crate::errors::TrendError;
use crate::models::weather_record::{round_temp, NOT_AVAILABLE};
use crate::sources::{ForecastSource, Geocoder};

/// Number of slots in a trend window
pub const WINDOW_SIZE: usize = 7;

/// Slot holding today in a fully populated window
pub const TODAY_SLOT: usize = 3;

const LABEL_FORMAT: &str = "%a %m/%d";

/// Aligned 7 slot view of daily max/min temperatures centered on today.
/// Slots past the end of the source series hold no value and the N/A label.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendWindow {
    pub dates: [String; WINDOW_SIZE],
    pub max_temps: [Option<f64>; WINDOW_SIZE],
    pub min_temps: [Option<f64>; WINDOW_SIZE],
    pub today_index: usize,
}

/// Everything the trend page needs to draw one city
#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub city: String,
    pub dates: [String; WINDOW_SIZE],
    pub max_temps: [Option<f64>; WINDOW_SIZE],
    pub min_temps: [Option<f64>; WINDOW_SIZE],
    pub max_trends: [f64; WINDOW_SIZE],
    pub min_trends: [f64; WINDOW_SIZE],
    pub today_index: usize,
}

/// Discrete reading of a trend magnitude, boundaries inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendClass {
    SteepWarming,
    Warming,
    Stable,
    Cooling,
    SteepCooling,
}

impl TrendClass {
    /// Maps a trend magnitude in degrees onto its tier
    ///
    /// # Arguments
    ///
    /// * 'trend' - signed trend value, positive means warming
    pub fn from_value(trend: f64) -> TrendClass {
        if trend >= 3.0 {
            TrendClass::SteepWarming
        } else if trend >= 1.0 {
            TrendClass::Warming
        } else if trend <= -3.0 {
            TrendClass::SteepCooling
        } else if trend <= -1.0 {
            TrendClass::Cooling
        } else {
            TrendClass::Stable
        }
    }
}

/// Implementation of the Display Trait for pretty print
impl fmt::Display for TrendClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrendClass::SteepWarming => write!(f, "steep warming"),
            TrendClass::Warming      => write!(f, "warming"),
            TrendClass::Stable       => write!(f, "stable"),
            TrendClass::Cooling      => write!(f, "cooling"),
            TrendClass::SteepCooling => write!(f, "steep cooling"),
        }
    }
}

/// Builds the 7 slot window for a city from the live forecast series.
///
/// The 13 day series is fetched in one query, sorted by date, rows with a
/// missing temperature are dropped and values rounded to 2 decimals. Today
/// is then located in what remains, with the series midpoint as anchor when
/// today is absent. After dropping rows the "slot 3 is today" alignment is
/// best effort, not a guarantee.
///
/// # Arguments
///
/// * 'source' - forecast window and geocoding provider
/// * 'city' - the city to build a window for
/// * 'today' - the date to anchor the window on
pub fn build_window<S>(source: &S, city: &str, today: NaiveDate) -> Result<TrendWindow, TrendError>
where
    S: ForecastSource + Geocoder,
{
    let coord = source.geocode(city)?
        .ok_or_else(|| TrendError(format!("city {} not found", city)))?;

    let mut readings = source.fetch_forecast_window(coord)?;
    readings.sort_by_key(|r| r.date);
    readings.retain(|r| r.temp_max.is_some() && r.temp_min.is_some());

    let anchor = readings.iter()
        .position(|r| r.date == today)
        .unwrap_or(readings.len() / 2);
    let start = anchor.saturating_sub(TODAY_SLOT);
    let end = (anchor + WINDOW_SIZE - TODAY_SLOT).min(readings.len());

    let mut dates: [String; WINDOW_SIZE] = std::array::from_fn(|_| NOT_AVAILABLE.to_string());
    let mut max_temps = [None; WINDOW_SIZE];
    let mut min_temps = [None; WINDOW_SIZE];

    for (slot, reading) in readings[start..end].iter().enumerate() {
        dates[slot] = reading.date.format(LABEL_FORMAT).to_string();
        max_temps[slot] = reading.temp_max.map(round_temp);
        min_temps[slot] = reading.temp_min.map(round_temp);
    }

    Ok(TrendWindow { dates, max_temps, min_temps, today_index: TODAY_SLOT })
}

/// Derives a signed trend magnitude per slot from a 7 slot series.
///
/// The first two slots carry the plain difference to the next slot, or 0
/// when a side is missing. From slot 2 on the value is the mean of the
/// 3 slot window ending at the slot minus the mean of the window ending one
/// slot earlier, so it reads as acceleration of change rather than a raw
/// day over day delta. A window mean only counts present values and stands
/// at 0 when the window is entirely absent. At slot 2 the previous window
/// duplicates the current one.
pub fn compute_trends(values: &[Option<f64>; WINDOW_SIZE]) -> [f64; WINDOW_SIZE] {
    let mut trends = [0.0; WINDOW_SIZE];

    for i in 0..WINDOW_SIZE {
        if i < 2 {
            if i + 1 < WINDOW_SIZE {
                if let (Some(a), Some(b)) = (values[i], values[i + 1]) {
                    trends[i] = b - a;
                }
            }
        } else {
            let current = window_mean(&values[i - 2..=i]);
            let previous = if i > 2 { window_mean(&values[i - 3..=i - 1]) } else { current };
            trends[i] = current - previous;
        }
    }

    trends
}

/// Mean over the present values of a window, 0 when none are present
fn window_mean(window: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = window.iter().flatten().copied().collect();
    if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    }
}

/// Builds the full trend report for one city, the structure the trend page
/// consumes
///
/// # Arguments
///
/// * 'source' - forecast window and geocoding provider
/// * 'city' - the city to report on
/// * 'today' - the date to anchor the window on
pub fn prepare_report<S>(source: &S, city: &str, today: NaiveDate) -> Result<TrendReport, TrendError>
where
    S: ForecastSource + Geocoder,
{
    let window = build_window(source, city, today)?;
    let max_trends = compute_trends(&window.max_temps);
    let min_trends = compute_trends(&window.min_temps);

    Ok(TrendReport {
        city: city.to_string(),
        dates: window.dates,
        max_temps: window.max_temps,
        min_temps: window.min_temps,
        max_trends,
        min_trends,
        today_index: window.today_index,
    })
}
