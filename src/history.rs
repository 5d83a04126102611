use std::collections::HashSet;
use std::fs;
use std::fs::OpenOptions;
use std::path::Path;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use crate::errors::StoreError;
use crate::models::weather_record::{WeatherRecord, NOT_AVAILABLE};

const HEADERS: [&str; 8] = ["timestamp", "date", "city", "temp_min", "temp_max", "temp_mean", "latitude", "longitude"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Append-only log of weather observations on stable storage.
///
/// Rows are only ever appended, never rewritten or deleted, and the header
/// row is written exactly once when the file is created. The store does not
/// coordinate concurrent writers, callers must serialize access.
pub struct HistoryStore {
    path: String,
}

/// Row as it sits in the file, numeric columns may hold the N/A marker
#[derive(Deserialize)]
struct RawRow {
    timestamp: String,
    date: String,
    city: String,
    temp_min: String,
    temp_max: String,
    temp_mean: String,
    latitude: String,
    longitude: String,
}

impl RawRow {
    fn into_record(self) -> Result<WeatherRecord, StoreError> {
        Ok(WeatherRecord {
            recorded_at: NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
                .map_err(|e| StoreError(format!("bad timestamp '{}': {}", self.timestamp, e)))?,
            date: NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
                .map_err(|e| StoreError(format!("bad date '{}': {}", self.date, e)))?,
            city: self.city,
            temp_min: parse_opt(&self.temp_min)?,
            temp_max: parse_opt(&self.temp_max)?,
            temp_mean: parse_opt(&self.temp_mean)?,
            latitude: self.latitude.parse()
                .map_err(|e| StoreError(format!("bad latitude '{}': {}", self.latitude, e)))?,
            longitude: self.longitude.parse()
                .map_err(|e| StoreError(format!("bad longitude '{}': {}", self.longitude, e)))?,
        })
    }
}

impl HistoryStore {
    /// Returns a HistoryStore over the given file path, without touching
    /// the file until the first append
    pub fn new(path: &str) -> HistoryStore {
        HistoryStore { path: path.to_string() }
    }

    /// Appends one record, creating the file and its header row on first use.
    ///
    /// Each call opens, writes and flushes on its own, so every row already
    /// appended survives an interruption of the process.
    ///
    /// # Arguments
    ///
    /// * 'record' - the observation to append
    pub fn append(&self, record: &WeatherRecord) -> Result<(), StoreError> {
        let path = Path::new(&self.path);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let write_header = !path.exists() || path.metadata()?.len() == 0;

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if write_header {
            writer.write_record(HEADERS)?;
        }
        writer.write_record([
            record.recorded_at.format(TIMESTAMP_FORMAT).to_string(),
            record.date.format(DATE_FORMAT).to_string(),
            record.city.clone(),
            fmt_temp(record.temp_min),
            fmt_temp(record.temp_max),
            fmt_temp(record.temp_mean),
            format!("{:.4}", record.latitude),
            format!("{:.4}", record.longitude),
        ])?;
        writer.flush()?;

        Ok(())
    }

    /// Returns a fresh lazy iterator over all rows in file order.
    ///
    /// Each call re-opens the file so the sequence is restartable from the
    /// beginning. Rows that fail to parse surface as row level errors.
    pub fn read_all(&self) -> Result<impl Iterator<Item = Result<WeatherRecord, StoreError>>, StoreError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        Ok(reader.into_deserialize::<RawRow>()
            .map(|row| row.map_err(StoreError::from).and_then(RawRow::into_record)))
    }

    /// Returns the newest date recorded in the store, or None when the file
    /// is missing, empty or any of its date values fails to parse
    pub fn last_date(&self) -> Option<NaiveDate> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .ok()?;

        let mut last: Option<NaiveDate> = None;
        for row in reader.into_deserialize::<RawRow>() {
            let row = row.ok()?;
            let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT).ok()?;
            last = Some(last.map_or(date, |d| d.max(date)));
        }

        last
    }

    /// Returns every (city, date) pair already recorded. Rows that cannot be
    /// parsed are left out, an unreadable store counts as having no keys.
    pub fn existing_keys(&self) -> HashSet<(String, NaiveDate)> {
        let mut keys = HashSet::new();

        if let Ok(rows) = self.read_all() {
            for row in rows.flatten() {
                keys.insert((row.city, row.date));
            }
        }

        keys
    }
}

fn fmt_temp(value: Option<f64>) -> String {
    value.map_or(NOT_AVAILABLE.to_string(), |t| format!("{:.2}", t))
}

fn parse_opt(value: &str) -> Result<Option<f64>, StoreError> {
    if value == NOT_AVAILABLE {
        Ok(None)
    } else {
        value.parse::<f64>()
            .map(Some)
            .map_err(|e| StoreError(format!("bad numeric value '{}': {}", value, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(city: &str, date: &str) -> WeatherRecord {
        WeatherRecord {
            city: city.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            temp_max: Some(21.46),
            temp_min: Some(12.3),
            temp_mean: None,
            latitude: 40.4165,
            longitude: -3.7026,
            recorded_at: NaiveDateTime::parse_from_str("2024-06-13 08:15", "%Y-%m-%d %H:%M").unwrap(),
        }
    }

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = HistoryStore::new(path.to_str().unwrap());

        let rec = record("Madrid", "2024-06-12");
        store.append(&rec).unwrap();

        let rows: Vec<WeatherRecord> = store.read_all().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![rec]);
    }

    #[test]
    fn absent_values_are_marked_not_blanked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = HistoryStore::new(path.to_str().unwrap());

        let mut rec = record("Madrid", "2024-06-12");
        rec.temp_max = None;
        rec.temp_min = None;
        store.append(&rec).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let data_line = contents.lines().nth(1).unwrap();
        assert_eq!(data_line.matches(NOT_AVAILABLE).count(), 3);
        assert!(!data_line.contains(",,"));

        let rows: Vec<WeatherRecord> = store.read_all().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].temp_max, None);
        assert_eq!(rows[0].temp_mean, None);
    }

    #[test]
    fn header_is_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = HistoryStore::new(path.to_str().unwrap());

        store.append(&record("Madrid", "2024-06-11")).unwrap();
        store.append(&record("Oslo", "2024-06-12")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,date,city,temp_min,temp_max,temp_mean,latitude,longitude");
    }

    #[test]
    fn last_date_is_the_max_over_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = HistoryStore::new(path.to_str().unwrap());

        store.append(&record("Madrid", "2024-06-12")).unwrap();
        store.append(&record("Oslo", "2024-06-10")).unwrap();

        assert_eq!(store.last_date(), NaiveDate::from_ymd_opt(2024, 6, 12));
    }

    #[test]
    fn last_date_none_for_missing_or_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = HistoryStore::new(path.to_str().unwrap());

        assert_eq!(store.last_date(), None);

        store.append(&record("Madrid", "2024-06-12")).unwrap();
        fs::write(&path, "timestamp,date,city,temp_min,temp_max,temp_mean,latitude,longitude\n2024-06-12 08:00,garbage,Madrid,1.00,2.00,1.50,40.4165,-3.7026\n").unwrap();
        assert_eq!(store.last_date(), None);
    }

    #[test]
    fn existing_keys_reflect_appended_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let store = HistoryStore::new(path.to_str().unwrap());

        store.append(&record("Madrid", "2024-06-11")).unwrap();
        store.append(&record("Madrid", "2024-06-12")).unwrap();

        let keys = store.existing_keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&("Madrid".to_string(), NaiveDate::from_ymd_opt(2024, 6, 11).unwrap())));
    }
}
