use thiserror::Error;

#[derive(Error, Debug)]
#[error("error in communication with OpenWeather: {0}")]
pub struct OwmError(pub String);
impl From<serde_json::Error> for OwmError {
    fn from(e: serde_json::Error) -> OwmError {
        OwmError(format!("json document error: {}", e.to_string()))
    }
}
impl From<reqwest::Error> for OwmError {
    fn from(e: reqwest::Error) -> OwmError {
        OwmError(format!("http request error: {}", e.to_string()))
    }
}
