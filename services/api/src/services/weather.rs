//! Weather lookups: resolve a place, fetch conditions, narrate them.

use crate::upstream::{
    Observation, Place, google::CustomSearch, google::Geocoder, open_meteo::OpenMeteo,
    openweather::OpenWeather,
};
use anyhow::Result;
use chrono::Utc;
use jarvis_core::wire::{Coordinates, WeatherData, WeatherReply, WeatherRequest};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const DEFAULT_LOCATION: &str = "New York";
const CLIENT_LOCATION: &str = "your location";

static QUERY_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(jarvis|weather|what'?s|whats|the|in|for|current|today|outside|here|like|is|how)\b")
        .expect("valid regex")
});
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Pulls the place name out of a spoken weather question.
pub fn extract_location(query: &str) -> Option<String> {
    let lowered = query.to_lowercase();
    let stripped = QUERY_WORDS.replace_all(&lowered, "");
    let stripped = PUNCTUATION.replace_all(&stripped, "");
    let location = WHITESPACE.replace_all(&stripped, " ").trim().to_string();
    (!location.is_empty()).then_some(location)
}

/// Whether the question is about wherever the user is.
fn wants_client_location(query: &str) -> bool {
    let lowered = query.to_lowercase();
    lowered.trim().is_empty() || lowered.contains("outside") || lowered.contains("here")
}

/// Composes the narrated weather report.
pub fn narrate(location: &str, observation: &Observation) -> String {
    let place = if location == CLIENT_LOCATION {
        "at your location".to_string()
    } else {
        format!("in {}", location)
    };
    let mut response = format!(
        "Current weather {}, Sir: {}°C with {}. ",
        place, observation.temperature, observation.condition
    );

    if let Some(humidity) = observation.humidity.filter(|h| *h != 0) {
        response.push_str(&format!("Humidity is {}%. ", humidity));
    }
    if observation.wind_speed != 0 {
        response.push_str(&format!("Wind speed is {} km/h. ", observation.wind_speed));
    }
    if let Some(pressure) = observation.pressure.filter(|p| *p != 0) {
        response.push_str(&format!("Atmospheric pressure is {} hPa. ", pressure));
    }
    if let Some(visibility) = observation.visibility.filter(|v| *v != 0) {
        response.push_str(&format!("Visibility is {} km. ", visibility));
    }

    let condition = observation.condition.to_lowercase();
    if observation.temperature < 0 {
        response.push_str("It's freezing - I recommend bundling up, Sir.");
    } else if observation.temperature > 30 {
        response.push_str("It's quite hot - please stay hydrated, Sir.");
    } else if condition.contains("rain") {
        response.push_str("You might want to take an umbrella, Sir.");
    } else if condition.contains("clear") || condition.contains("sunny") {
        response.push_str("Perfect weather for outdoor activities, Sir.");
    }
    response
}

pub fn location_not_found(location: &str) -> String {
    format!(
        "I couldn't find location data for {}, Sir. Could you specify a different city or region?",
        location
    )
}

pub struct WeatherService {
    open_meteo: OpenMeteo,
    geocoder: Option<Geocoder>,
    openweather: Option<OpenWeather>,
    search: Option<CustomSearch>,
}

impl WeatherService {
    pub fn new(
        open_meteo: OpenMeteo,
        geocoder: Option<Geocoder>,
        openweather: Option<OpenWeather>,
        search: Option<CustomSearch>,
    ) -> Self {
        Self {
            open_meteo,
            geocoder,
            openweather,
            search,
        }
    }

    pub async fn lookup(&self, request: WeatherRequest) -> Result<WeatherReply> {
        let place = match request.user_location {
            Some(user) if wants_client_location(&request.query) => {
                let mut name = user.city.unwrap_or_else(|| CLIENT_LOCATION.to_string());
                if let Some(geocoder) = &self.geocoder {
                    match geocoder.reverse(user.latitude, user.longitude).await {
                        Ok(Some(city)) => name = city,
                        Ok(None) => {}
                        Err(e) => warn!(error = ?e, "Reverse geocoding failed"),
                    }
                }
                Place {
                    name,
                    latitude: user.latitude,
                    longitude: user.longitude,
                }
            }
            _ => {
                let wanted = extract_location(&request.query)
                    .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
                match self.resolve(&wanted).await? {
                    Some(place) => place,
                    None => {
                        info!(location = %wanted, "Location not found");
                        return Ok(WeatherReply {
                            response: location_not_found(&wanted),
                            weather_data: None,
                        });
                    }
                }
            }
        };

        let observation = self.observe(place.latitude, place.longitude).await?;
        let mut response = narrate(&place.name, &observation);
        if let Some(extra) = self.search_snippet(&place.name).await {
            response.push_str(&format!("\n\nAdditional current conditions: {}", extra));
        }

        Ok(WeatherReply {
            response,
            weather_data: Some(WeatherData {
                temperature: observation.temperature,
                condition: observation.condition,
                humidity: observation.humidity,
                wind_speed: observation.wind_speed,
                pressure: observation.pressure,
                visibility: observation.visibility,
                location: place.name,
                coordinates: Coordinates {
                    latitude: place.latitude,
                    longitude: place.longitude,
                },
                last_updated: Utc::now(),
            }),
        })
    }

    /// Google geocoding when keyed, Open-Meteo otherwise or on failure.
    async fn resolve(&self, location: &str) -> Result<Option<Place>> {
        if let Some(geocoder) = &self.geocoder {
            match geocoder.forward(location).await {
                Ok(Some(place)) => return Ok(Some(place)),
                Ok(None) => debug!(location, "Google found no match, trying Open-Meteo"),
                Err(e) => warn!(error = ?e, "Google geocoding failed, trying Open-Meteo"),
            }
        }
        self.open_meteo.geocode(location).await
    }

    /// OpenWeatherMap when keyed, Open-Meteo otherwise or on failure.
    async fn observe(&self, latitude: f64, longitude: f64) -> Result<Observation> {
        if let Some(openweather) = &self.openweather {
            match openweather.current(latitude, longitude).await {
                Ok(observation) => return Ok(observation),
                Err(e) => warn!(error = ?e, "OpenWeatherMap failed, falling back to Open-Meteo"),
            }
        }
        self.open_meteo.current(latitude, longitude).await
    }

    async fn search_snippet(&self, location: &str) -> Option<String> {
        let search = self.search.as_ref()?;
        let query = format!("current weather conditions {} today real time", location);
        match search.search(&query, 3, false).await {
            Ok(results) => results
                .items
                .into_iter()
                .next()
                .map(|item| item.snippet)
                .filter(|s| !s.is_empty()),
            Err(e) => {
                debug!(error = ?e, "Weather snippet search failed");
                None
            }
        }
    }
}
