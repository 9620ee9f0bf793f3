//! Google Custom Search and Maps Geocoding.

use super::{Place, json_or_status};
use anyhow::{Context, Result};
use jarvis_core::wire::Source;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SEARCH_BASE_URL: &str = "https://www.googleapis.com";
const MAPS_BASE_URL: &str = "https://maps.googleapis.com";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub display_link: String,
}

impl From<SearchItem> for Source {
    fn from(item: SearchItem) -> Self {
        Source {
            title: item.title,
            url: item.link,
            snippet: item.snippet,
            source: item.display_link,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInformation {
    /// Google reports the count as a decimal string.
    #[serde(default)]
    total_results: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(default)]
    search_information: SearchInformation,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub items: Vec<SearchItem>,
    pub total_results: u64,
}

impl From<SearchResponse> for SearchResults {
    fn from(response: SearchResponse) -> Self {
        Self {
            total_results: response
                .search_information
                .total_results
                .parse()
                .unwrap_or(0),
            items: response.items,
        }
    }
}

/// One Programmable Search Engine (`cx`) queried with an API key.
#[derive(Clone)]
pub struct CustomSearch {
    http: Client,
    api_key: String,
    engine_id: String,
    base_url: String,
}

impl CustomSearch {
    pub fn new(http: Client, api_key: String, engine_id: String) -> Self {
        Self::with_base_url(http, api_key, engine_id, SEARCH_BASE_URL)
    }

    pub fn with_base_url(http: Client, api_key: String, engine_id: String, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            engine_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Runs `query`, returning at most `num` results, optionally newest first.
    pub async fn search(&self, query: &str, num: u8, sort_by_date: bool) -> Result<SearchResults> {
        debug!(query, num, sort_by_date, "Google custom search");
        let num = num.to_string();
        let mut params = vec![
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ];
        if sort_by_date {
            params.push(("sort", "date"));
        }

        let response = self
            .http
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&params)
            .send()
            .await
            .context("Failed to reach Google Custom Search")?;
        let body: SearchResponse = json_or_status("Google Custom Search", response).await?;
        Ok(body.into())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl GeocodeResult {
    /// The city, or failing that the state, this result lies in.
    fn locality(&self) -> Option<&str> {
        self.address_components
            .iter()
            .find(|c| {
                c.types
                    .iter()
                    .any(|t| t == "locality" || t == "administrative_area_level_1")
            })
            .map(|c| c.long_name.as_str())
    }
}

#[derive(Clone)]
pub struct Geocoder {
    http: Client,
    api_key: String,
    base_url: String,
}

impl Geocoder {
    pub fn new(http: Client, api_key: String) -> Self {
        Self::with_base_url(http, api_key, MAPS_BASE_URL)
    }

    pub fn with_base_url(http: Client, api_key: String, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn geocode(&self, params: &[(&str, &str)]) -> Result<GeocodeResponse> {
        let response = self
            .http
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to reach Google Geocoding")?;
        json_or_status("Google Geocoding", response).await
    }

    /// Resolves a free-form address to coordinates.
    pub async fn forward(&self, address: &str) -> Result<Option<Place>> {
        let body = self.geocode(&[("address", address)]).await?;
        Ok(body.results.into_iter().next().map(|r| Place {
            name: r.formatted_address,
            latitude: r.geometry.location.lat,
            longitude: r.geometry.location.lng,
        }))
    }

    /// Names the city at the given coordinates.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        let latlng = format!("{},{}", latitude, longitude);
        let body = self.geocode(&[("latlng", latlng.as_str())]).await?;
        Ok(body
            .results
            .first()
            .and_then(GeocodeResult::locality)
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_response_parses_google_shape() {
        let body = json!({
            "searchInformation": {"totalResults": "1240"},
            "items": [
                {"title": "Arc reactor", "link": "https://example.com/arc", "snippet": "Clean energy", "displayLink": "example.com"},
                {"title": "No snippet", "link": "https://example.org"}
            ]
        });
        let results: SearchResults = serde_json::from_value::<SearchResponse>(body).unwrap().into();
        assert_eq!(results.total_results, 1240);
        assert_eq!(results.items.len(), 2);
        assert_eq!(results.items[1].snippet, "");

        let source: Source = results.items[0].clone().into();
        assert_eq!(source.url, "https://example.com/arc");
        assert_eq!(source.source, "example.com");
    }

    #[test]
    fn test_empty_search_response() {
        let results: SearchResults = serde_json::from_value::<SearchResponse>(json!({}))
            .unwrap()
            .into();
        assert!(results.items.is_empty());
        assert_eq!(results.total_results, 0);
    }

    #[test]
    fn test_locality_prefers_first_city_or_state_component() {
        let body = json!({
            "results": [{
                "formatted_address": "Malibu, CA, USA",
                "geometry": {"location": {"lat": 34.03, "lng": -118.78}},
                "address_components": [
                    {"long_name": "10880", "types": ["street_number"]},
                    {"long_name": "Malibu", "types": ["locality", "political"]},
                    {"long_name": "California", "types": ["administrative_area_level_1"]}
                ]
            }]
        });
        let response: GeocodeResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.results[0].locality(), Some("Malibu"));
    }
}
