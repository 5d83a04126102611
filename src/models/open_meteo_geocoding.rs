use serde::Deserialize;

#[derive(Deserialize)]
pub struct GeocodingMatch {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct GeocodingResponse {
    pub results: Option<Vec<GeocodingMatch>>,
}
