//! OpenWeatherMap current-conditions API.

use super::{Observation, json_or_status};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    wind: Wind,
    /// Metres.
    #[serde(default)]
    visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    /// Metres per second.
    speed: f64,
}

impl From<CurrentResponse> for Observation {
    fn from(current: CurrentResponse) -> Self {
        Observation {
            temperature: current.main.temp.round() as i64,
            condition: current
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_else(|| "unusual conditions".to_string()),
            humidity: current.main.humidity.map(|h| h.round() as i64),
            wind_speed: (current.wind.speed * 3.6).round() as i64,
            pressure: current.main.pressure.map(|p| p.round() as i64),
            visibility: current
                .visibility
                .filter(|v| *v > 0.0)
                .map(|v| (v / 1000.0).round() as i64),
        }
    }
}

#[derive(Clone)]
pub struct OpenWeather {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeather {
    pub fn new(http: Client, api_key: String) -> Self {
        Self::with_base_url(http, api_key, BASE_URL)
    }

    pub fn with_base_url(http: Client, api_key: String, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<Observation> {
        let response = self
            .http
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .context("Failed to reach OpenWeatherMap")?;
        let body: CurrentResponse = json_or_status("OpenWeatherMap", response).await?;
        Ok(body.into())
    }
}
