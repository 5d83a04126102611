use std::collections::HashMap;
use chrono::{Local, NaiveDate, TimeDelta};
use log::{error, warn};
use crate::errors::SourceError;
use crate::history::HistoryStore;
use crate::models::weather_record::{round_coord, round_temp, WeatherRecord};
use crate::sources::{Coordinates, CurrentSource, Geocoder, HistoricalSource};

/// Outcome counters for one backfill run
#[derive(Debug, Default, PartialEq)]
pub struct BackfillSummary {
    pub appended: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Determines the inclusive date range missing from the store.
///
/// When the store is missing, empty or its dates cannot be read, the last
/// recorded date is assumed to lie fallback_days back, so the range covers
/// exactly that many days ending today. Returns None when there is nothing
/// to do, which is a normal outcome and not an error.
///
/// # Arguments
///
/// * 'store' - the history store to inspect
/// * 'today' - the current calendar date
/// * 'fallback_days' - look-back used when the store has no usable last date
pub fn detect_gap(store: &HistoryStore, today: NaiveDate, fallback_days: i64) -> Option<(NaiveDate, NaiveDate)> {
    let last = store.last_date().unwrap_or(today - TimeDelta::days(fallback_days));

    let from = last + TimeDelta::days(1);
    if from > today {
        None
    } else {
        Some((from, today))
    }
}

/// Fetches and persists every missing (city, date) pair in the range.
///
/// Dates before today are answered by the historical source with a point
/// query, today and later by the live source, never both for the same date.
/// Pairs already recorded in the store are skipped so re-running over the
/// same gap cannot duplicate rows. A failing pair is logged and skipped,
/// it never aborts the batch, and every record is appended immediately so
/// an interrupted run keeps the rows written so far.
///
/// # Arguments
///
/// * 'historical' - source for past dates
/// * 'current' - source for today
/// * 'geocoder' - resolves city names for the historical point queries
/// * 'store' - the history store rows are appended to
/// * 'cities' - the city set for this run
/// * 'from' - first date of the gap, inclusive
/// * 'to' - last date of the gap, inclusive
/// * 'today' - the date the source selection pivots on
pub fn run_backfill<H, C, G>(
    historical: &H,
    current: &C,
    geocoder: &G,
    store: &HistoryStore,
    cities: &[String],
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> BackfillSummary
where
    H: HistoricalSource,
    C: CurrentSource,
    G: Geocoder,
{
    let existing = store.existing_keys();
    let mut located: HashMap<String, Option<Coordinates>> = HashMap::new();
    let mut summary = BackfillSummary::default();

    for city in cities {
        for date in from.iter_days().take_while(|d| *d <= to) {
            if existing.contains(&(city.clone(), date)) {
                summary.skipped += 1;
                continue;
            }

            let record = if date < today {
                historical_record(historical, geocoder, &mut located, city, date)
            } else {
                current_record(current, city, date)
            };

            match record {
                Ok(record) => match store.append(&record) {
                    Ok(()) => summary.appended += 1,
                    Err(e) => {
                        error!("could not persist {} {}: {}", city, date, e);
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    warn!("skipping {} {}: {}", city, date, e);
                    summary.failed += 1;
                }
            }
        }
    }

    summary
}

/// Builds a record for one past date from the archive. Coordinates are
/// resolved at most once per city and run.
fn historical_record<H, G>(
    historical: &H,
    geocoder: &G,
    located: &mut HashMap<String, Option<Coordinates>>,
    city: &str,
    date: NaiveDate,
) -> Result<WeatherRecord, SourceError>
where
    H: HistoricalSource,
    G: Geocoder,
{
    let coord = match located.get(city) {
        Some(coord) => *coord,
        None => {
            let coord = geocoder.geocode(city)?;
            located.insert(city.to_string(), coord);
            coord
        }
    };
    let coord = coord.ok_or_else(|| SourceError(format!("city {} not found", city)))?;

    let aggregate = historical.fetch_historical(coord, date)?;

    Ok(WeatherRecord {
        city: city.to_string(),
        date,
        temp_max: aggregate.temp_max.map(round_temp),
        temp_min: aggregate.temp_min.map(round_temp),
        temp_mean: aggregate.temp_mean.map(round_temp),
        latitude: round_coord(coord.lat),
        longitude: round_coord(coord.long),
        recorded_at: Local::now().naive_local(),
    })
}

/// Builds a record for today from the live snapshot. The snapshot has a
/// single temperature which stands in for max, min and mean alike.
fn current_record<C>(current: &C, city: &str, date: NaiveDate) -> Result<WeatherRecord, SourceError>
where
    C: CurrentSource,
{
    let snapshot = current.fetch_current(city)?;
    let temp = snapshot.temp.map(round_temp);

    Ok(WeatherRecord {
        city: snapshot.city,
        date,
        temp_max: temp,
        temp_min: temp,
        temp_mean: temp,
        latitude: round_coord(snapshot.coord.lat),
        longitude: round_coord(snapshot.coord.long),
        recorded_at: Local::now().naive_local(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use chrono::NaiveDateTime;
    use crate::sources::{CurrentSnapshot, DailyAggregate};

    struct FakeHistorical {
        calls: RefCell<Vec<NaiveDate>>,
        fail_on: Option<NaiveDate>,
    }

    impl FakeHistorical {
        fn new() -> FakeHistorical {
            FakeHistorical { calls: RefCell::new(Vec::new()), fail_on: None }
        }
    }

    impl HistoricalSource for FakeHistorical {
        fn fetch_historical(&self, _coord: Coordinates, date: NaiveDate) -> Result<DailyAggregate, SourceError> {
            self.calls.borrow_mut().push(date);
            if self.fail_on == Some(date) {
                return Err(SourceError("archive outage".to_string()));
            }
            Ok(DailyAggregate {
                temp_max: Some(20.123),
                temp_min: Some(10.456),
                temp_mean: Some(15.288),
            })
        }
    }

    struct FakeCurrent {
        calls: RefCell<Vec<String>>,
    }

    impl FakeCurrent {
        fn new() -> FakeCurrent {
            FakeCurrent { calls: RefCell::new(Vec::new()) }
        }
    }

    impl CurrentSource for FakeCurrent {
        fn fetch_current(&self, city: &str) -> Result<CurrentSnapshot, SourceError> {
            self.calls.borrow_mut().push(city.to_string());
            Ok(CurrentSnapshot {
                city: city.to_string(),
                coord: Coordinates { lat: 40.41649, long: -3.70259 },
                temp: Some(22.456),
            })
        }
    }

    struct FakeGeocoder {
        known: bool,
        calls: RefCell<usize>,
    }

    impl Geocoder for FakeGeocoder {
        fn geocode(&self, _city: &str) -> Result<Option<Coordinates>, SourceError> {
            *self.calls.borrow_mut() += 1;
            if self.known {
                Ok(Some(Coordinates { lat: 40.41649, long: -3.70259 }))
            } else {
                Ok(None)
            }
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seeded_store(dir: &std::path::Path, city: &str, dates: &[&str]) -> HistoryStore {
        let store = HistoryStore::new(dir.join("history.csv").to_str().unwrap());
        for d in dates {
            store.append(&WeatherRecord {
                city: city.to_string(),
                date: date(d),
                temp_max: Some(20.0),
                temp_min: Some(10.0),
                temp_mean: Some(15.0),
                latitude: 40.4165,
                longitude: -3.7026,
                recorded_at: NaiveDateTime::parse_from_str("2024-06-10 08:00", "%Y-%m-%d %H:%M").unwrap(),
            }).unwrap();
        }
        store
    }

    #[test]
    fn gap_is_empty_when_store_is_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path(), "Madrid", &["2024-06-13"]);

        assert_eq!(detect_gap(&store, date("2024-06-13"), 7), None);
    }

    #[test]
    fn gap_defaults_to_the_fallback_lookback() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv").to_str().unwrap());

        let (from, to) = detect_gap(&store, date("2024-06-13"), 7).unwrap();
        assert_eq!(from, date("2024-06-07"));
        assert_eq!(to, date("2024-06-13"));
        assert_eq!(from.iter_days().take_while(|d| *d <= to).count(), 7);
    }

    #[test]
    fn gap_resumes_after_the_last_recorded_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path(), "Madrid", &["2024-06-09", "2024-06-10"]);

        let (from, to) = detect_gap(&store, date("2024-06-13"), 7).unwrap();
        assert_eq!((from, to), (date("2024-06-11"), date("2024-06-13")));
    }

    #[test]
    fn past_dates_go_to_the_archive_and_today_to_the_live_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path(), "Madrid", &["2024-06-10"]);
        let historical = FakeHistorical::new();
        let current = FakeCurrent::new();
        let geocoder = FakeGeocoder { known: true, calls: RefCell::new(0) };

        let cities = vec!["Madrid".to_string()];
        let summary = run_backfill(
            &historical, &current, &geocoder, &store, &cities,
            date("2024-06-11"), date("2024-06-13"), date("2024-06-13"),
        );

        assert_eq!(*historical.calls.borrow(), vec![date("2024-06-11"), date("2024-06-12")]);
        assert_eq!(*current.calls.borrow(), vec!["Madrid".to_string()]);
        assert_eq!(summary, BackfillSummary { appended: 3, skipped: 0, failed: 0 });
        assert_eq!(store.last_date(), Some(date("2024-06-13")));
    }

    #[test]
    fn coordinates_are_resolved_once_per_city() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv").to_str().unwrap());
        let historical = FakeHistorical::new();
        let current = FakeCurrent::new();
        let geocoder = FakeGeocoder { known: true, calls: RefCell::new(0) };

        let cities = vec!["Madrid".to_string()];
        run_backfill(
            &historical, &current, &geocoder, &store, &cities,
            date("2024-06-10"), date("2024-06-12"), date("2024-06-13"),
        );

        assert_eq!(*geocoder.calls.borrow(), 1);
        assert_eq!(historical.calls.borrow().len(), 3);
    }

    #[test]
    fn recorded_pairs_are_not_fetched_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path(), "Madrid", &["2024-06-11"]);
        let historical = FakeHistorical::new();
        let current = FakeCurrent::new();
        let geocoder = FakeGeocoder { known: true, calls: RefCell::new(0) };

        let cities = vec!["Madrid".to_string()];
        let summary = run_backfill(
            &historical, &current, &geocoder, &store, &cities,
            date("2024-06-11"), date("2024-06-12"), date("2024-06-13"),
        );

        assert_eq!(*historical.calls.borrow(), vec![date("2024-06-12")]);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn a_failing_pair_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv").to_str().unwrap());
        let mut historical = FakeHistorical::new();
        historical.fail_on = Some(date("2024-06-11"));
        let current = FakeCurrent::new();
        let geocoder = FakeGeocoder { known: true, calls: RefCell::new(0) };

        let cities = vec!["Madrid".to_string()];
        let summary = run_backfill(
            &historical, &current, &geocoder, &store, &cities,
            date("2024-06-11"), date("2024-06-13"), date("2024-06-13"),
        );

        assert_eq!(summary, BackfillSummary { appended: 2, skipped: 0, failed: 1 });
    }

    #[test]
    fn an_unknown_city_still_gets_its_live_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv").to_str().unwrap());
        let historical = FakeHistorical::new();
        let current = FakeCurrent::new();
        let geocoder = FakeGeocoder { known: false, calls: RefCell::new(0) };

        let cities = vec!["Atlantis".to_string()];
        let summary = run_backfill(
            &historical, &current, &geocoder, &store, &cities,
            date("2024-06-12"), date("2024-06-13"), date("2024-06-13"),
        );

        assert!(historical.calls.borrow().is_empty());
        assert_eq!(*current.calls.borrow(), vec!["Atlantis".to_string()]);
        assert_eq!(summary, BackfillSummary { appended: 1, skipped: 0, failed: 1 });
    }

    #[test]
    fn values_are_rounded_to_the_documented_precision() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv").to_str().unwrap());
        let historical = FakeHistorical::new();
        let current = FakeCurrent::new();
        let geocoder = FakeGeocoder { known: true, calls: RefCell::new(0) };

        let cities = vec!["Madrid".to_string()];
        run_backfill(
            &historical, &current, &geocoder, &store, &cities,
            date("2024-06-12"), date("2024-06-12"), date("2024-06-13"),
        );

        let rows: Vec<WeatherRecord> = store.read_all().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].temp_max, Some(20.12));
        assert_eq!(rows[0].temp_min, Some(10.46));
        assert_eq!(rows[0].latitude, 40.4165);
        assert_eq!(rows[0].longitude, -3.7026);
    }
}
