//! Open-Meteo geocoding and forecast APIs. Free and keyless.

use super::{Observation, Place, json_or_status};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_BASE_URL: &str = "https://api.open-meteo.com";
const USER_AGENT: &str = "JARVIS-Assistant/1.0";

/// Describes a WMO weather interpretation code.
pub fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "slight snow",
        73 => "moderate snow",
        75 => "heavy snow",
        95 => "thunderstorm",
        _ => "unusual conditions",
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
    #[serde(default)]
    hourly: Hourly,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: u32,
}

#[derive(Debug, Default, Deserialize)]
struct Hourly {
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pressure_msl: Vec<Option<f64>>,
}

fn first_rounded(values: &[Option<f64>]) -> Option<i64> {
    values.first().copied().flatten().map(|v| v.round() as i64)
}

impl From<ForecastResponse> for Observation {
    fn from(forecast: ForecastResponse) -> Self {
        let current = forecast.current_weather;
        Observation {
            temperature: current.temperature.round() as i64,
            condition: describe_weather_code(current.weathercode).to_string(),
            humidity: first_rounded(&forecast.hourly.relative_humidity_2m),
            wind_speed: current.windspeed.round() as i64,
            pressure: first_rounded(&forecast.hourly.pressure_msl),
            visibility: None,
        }
    }
}

#[derive(Clone)]
pub struct OpenMeteo {
    http: Client,
    geocoding_base_url: String,
    forecast_base_url: String,
}

impl OpenMeteo {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            geocoding_base_url: GEOCODING_BASE_URL.to_string(),
            forecast_base_url: FORECAST_BASE_URL.to_string(),
        }
    }

    /// Serves both geocoding and forecasts from `base_url`.
    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http,
            geocoding_base_url: base_url.clone(),
            forecast_base_url: base_url,
        }
    }

    pub async fn geocode(&self, name: &str) -> Result<Option<Place>> {
        let response = self
            .http
            .get(format!("{}/v1/search", self.geocoding_base_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[
                ("name", name),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to reach Open-Meteo geocoding")?;
        let body: GeocodingResponse = json_or_status("Open-Meteo geocoding", response).await?;
        Ok(body.results.into_iter().next().map(|r| Place {
            name: match r.country_code {
                Some(country) => format!("{}, {}", r.name, country),
                None => r.name,
            },
            latitude: r.latitude,
            longitude: r.longitude,
        }))
    }

    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<Observation> {
        let response = self
            .http
            .get(format!("{}/v1/forecast", self.forecast_base_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
                (
                    "hourly",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,pressure_msl".to_string(),
                ),
                ("temperature_unit", "celsius".to_string()),
                ("windspeed_unit", "kmh".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("Failed to reach Open-Meteo forecast")?;
        let body: ForecastResponse = json_or_status("Open-Meteo forecast", response).await?;
        Ok(body.into())
    }
}
