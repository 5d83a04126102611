use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ArchiveDaily {
    pub time: Vec<NaiveDate>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub temperature_2m_mean: Vec<Option<f64>>,
}

#[derive(Deserialize)]
pub struct ArchiveResponse {
    pub daily: ArchiveDaily,
}
