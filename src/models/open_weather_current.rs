use serde::Deserialize;

#[derive(Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
pub struct MainValues {
    pub temp: Option<f64>,
}

#[derive(Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    pub coord: Coord,
    pub main: MainValues,
}
