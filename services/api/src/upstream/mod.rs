//! Thin clients for the third-party APIs behind the live-data endpoints.
//!
//! Each client returns `anyhow::Result`; callers decide whether a failure
//! means falling back to another source or to the text-generation service.

pub mod duckduckgo;
pub mod google;
pub mod open_meteo;
pub mod openweather;

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

/// A resolved place name with coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions as reported by a weather provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub temperature: i64,
    pub condition: String,
    pub humidity: Option<i64>,
    /// km/h
    pub wind_speed: i64,
    /// hPa
    pub pressure: Option<i64>,
    /// km
    pub visibility: Option<i64>,
}

/// Decodes a JSON body, turning non-2xx statuses into errors.
pub(crate) async fn json_or_status<T: DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "{} API error {}: {}",
            service,
            status,
            body.chars().take(200).collect::<String>()
        ));
    }
    Ok(response.json::<T>().await?)
}

#[cfg(test)]
pub(crate) mod stub {
    use axum::Router;

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
