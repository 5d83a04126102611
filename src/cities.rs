use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use log::warn;

/// Builds the set of cities a backfill run should cover, the union of the
/// most frequently searched cities and the user's favorites, deduplicated.
///
/// The set is derived fresh on every run and never cached. Missing or
/// unreadable inputs contribute nothing, they are not errors.
///
/// # Arguments
///
/// * 'search_log' - path to the search log csv holding a 'city' column
/// * 'favorites_file' - path to the favorites json list
/// * 'top_limit' - how many of the most searched cities to include
/// * 'max_favorites' - cap on the favorites contribution
pub fn build_city_set(search_log: &str, favorites_file: &str, top_limit: usize, max_favorites: usize) -> Vec<String> {
    let mut set: HashSet<String> = top_searched(search_log, top_limit).into_iter().collect();
    set.extend(favorites(favorites_file, max_favorites));

    let mut cities: Vec<String> = set.into_iter().collect();
    cities.sort();

    cities
}

/// Returns the most searched cities by occurrence count in the search log
fn top_searched(search_log: &str, limit: usize) -> Vec<String> {
    let mut reader = match csv::ReaderBuilder::new().has_headers(true).from_path(search_log) {
        Ok(r) => r,
        Err(_) => return Vec::new(),
    };

    let city_column = match reader.headers() {
        Ok(headers) => match headers.iter().position(|h| h == "city") {
            Some(i) => i,
            None => return Vec::new(),
        },
        Err(e) => {
            warn!("unreadable search log: {}", e);
            return Vec::new();
        }
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in reader.into_records() {
        if let Ok(row) = row {
            if let Some(city) = row.get(city_column) {
                if !city.is_empty() {
                    *counts.entry(city.to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked.into_iter().take(limit).map(|(city, _)| city).collect()
}

/// Returns the favorites list capped at the configured count
fn favorites(favorites_file: &str, max_favorites: usize) -> Vec<String> {
    if !Path::new(favorites_file).exists() {
        return Vec::new();
    }

    let json = match fs::read_to_string(favorites_file) {
        Ok(j) => j,
        Err(e) => {
            warn!("unreadable favorites file: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<String>>(&json) {
        Ok(mut list) => {
            list.truncate(max_favorites);
            list
        }
        Err(e) => {
            warn!("favorites file is not a json list: {}", e);
            Vec::new()
        }
    }
}
