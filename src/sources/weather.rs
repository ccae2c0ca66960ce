//! Current weather from the Open-Meteo forecast API.

use super::download::{DownloadConfig, DownloadError, download_bytes};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Weather errors
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Weather download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Invalid weather URL: {0}")]
    Url(String),

    #[error("Failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Weather at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature_c: Option<f64>,
    pub weather_code: Option<u16>,
    pub temp_max_c: Option<f64>,
    pub temp_min_c: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ForecastResponse {
    #[serde(default)]
    current: CurrentBlock,
    #[serde(default)]
    daily: DailyBlock,
}

#[derive(Debug, Deserialize, Default)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    weather_code: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct DailyBlock {
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
}

/// Parse an Open-Meteo forecast response body
pub fn parse_forecast(body: &[u8]) -> Result<WeatherSnapshot, WeatherError> {
    let response: ForecastResponse = serde_json::from_slice(body)?;
    Ok(WeatherSnapshot {
        temperature_c: response.current.temperature_2m,
        weather_code: response.current.weather_code,
        temp_max_c: response.daily.temperature_2m_max.first().copied().flatten(),
        temp_min_c: response.daily.temperature_2m_min.first().copied().flatten(),
    })
}

/// Label for a WMO weather code
pub fn describe_code(code: Option<u16>) -> &'static str {
    match code {
        Some(0) => "Clear",
        Some(1) => "Mainly clear",
        Some(2) => "Partly cloudy",
        Some(3) => "Overcast",
        Some(45) => "Fog",
        Some(48) => "Rime fog",
        Some(51 | 53 | 55) => "Drizzle",
        Some(56 | 57) => "Freezing drizzle",
        Some(61 | 63 | 65) => "Rain",
        Some(66 | 67) => "Freezing rain",
        Some(71 | 73 | 75) => "Snow",
        Some(77) => "Snow grains",
        Some(80..=82) => "Rain showers",
        Some(85 | 86) => "Snow showers",
        Some(95 | 96 | 99) => "Thunderstorm",
        _ => "Unknown",
    }
}

/// Open-Meteo client for a fixed location
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    latitude: f64,
    longitude: f64,
    timezone: String,
    timeout: Duration,
}

impl WeatherProvider {
    pub fn new(latitude: f64, longitude: f64, timezone: &str, timeout: Duration) -> Self {
        Self {
            latitude,
            longitude,
            timezone: timezone.to_string(),
            timeout,
        }
    }

    fn url(&self) -> Result<reqwest::Url, WeatherError> {
        reqwest::Url::parse_with_params(
            FORECAST_URL,
            &[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("current", "temperature_2m,weather_code".to_string()),
                ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
                ("timezone", self.timezone.clone()),
            ],
        )
        .map_err(|e| WeatherError::Url(e.to_string()))
    }

    pub async fn fetch_weather(&self) -> Result<WeatherSnapshot, WeatherError> {
        let url = self.url()?;
        tracing::info!("Fetching weather for {},{}", self.latitude, self.longitude);

        let config = DownloadConfig {
            max_retries: 1,
            timeout: Some(self.timeout),
            ..DownloadConfig::default()
        };
        let body = download_bytes(url.as_str(), &config).await?;
        parse_forecast(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast() {
        let body = br#"{
            "current": {"temperature_2m": 12.3, "weather_code": 61},
            "daily": {"temperature_2m_max": [15.0, 16.1], "temperature_2m_min": [8.5, 9.0]}
        }"#;
        let snapshot = parse_forecast(body).unwrap();
        assert_eq!(snapshot.temperature_c, Some(12.3));
        assert_eq!(snapshot.weather_code, Some(61));
        assert_eq!(snapshot.temp_max_c, Some(15.0));
        assert_eq!(snapshot.temp_min_c, Some(8.5));
    }

    #[test]
    fn test_parse_forecast_missing_blocks() {
        let snapshot = parse_forecast(br#"{"current": {}}"#).unwrap();
        assert_eq!(snapshot, WeatherSnapshot::default());
    }

    #[test]
    fn test_describe_code() {
        assert_eq!(describe_code(Some(0)), "Clear");
        assert_eq!(describe_code(Some(81)), "Rain showers");
        assert_eq!(describe_code(Some(42)), "Unknown");
        assert_eq!(describe_code(None), "Unknown");
    }

    #[test]
    fn test_url_carries_location() {
        let provider = WeatherProvider::new(41.0082, 28.9784, "Europe/Istanbul", Duration::from_secs(10));
        let url = provider.url().unwrap();
        let query = url.query().unwrap_or_default();
        assert!(query.contains("latitude=41.0082"));
        assert!(query.contains("timezone=Europe%2FIstanbul"));
    }
}
