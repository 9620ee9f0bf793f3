//! JSON shapes exchanged with the assistant's HTTP endpoints.
//!
//! Field names are camelCase on the wire so that browser clients and the
//! `jarvis-api` service agree without per-field renames.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Uniform reply carrying only narrated text. Also the error body shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TextReply {
    pub response: String,
}

impl TextReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ChatRequest {
    #[cfg_attr(feature = "openapi", schema(example = "Explain how arc reactors work"))]
    pub message: String,
}

/// A citation attached to search and news replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Source {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SearchReply {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct NewsReply {
    pub response: String,
    #[serde(default)]
    pub articles: Vec<Source>,
    #[serde(default)]
    pub total_results: u64,
}

/// A position reported by the client, used for "weather outside" queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WeatherRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<UserLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized current conditions, whichever weather provider answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WeatherData {
    pub temperature: i64,
    pub condition: String,
    pub humidity: Option<i64>,
    pub wind_speed: i64,
    pub pressure: Option<i64>,
    pub visibility: Option<i64>,
    pub location: String,
    pub coordinates: Coordinates,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WeatherReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<WeatherData>,
}

/// The live-data lookups served by the composite real-time endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum RealtimeKind {
    Stock,
    Crypto,
    Sports,
    Traffic,
    Trends,
    /// Also used for any `type` this server does not know.
    #[serde(other)]
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RealtimeRequest {
    pub query: String,
    #[serde(rename = "type", default = "default_realtime_kind")]
    pub kind: RealtimeKind,
}

fn default_realtime_kind() -> RealtimeKind {
    RealtimeKind::General
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SystemControlRequest {
    #[cfg_attr(feature = "openapi", schema(example = "open calculator"))]
    pub command: String,
}

/// Output formats the document generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum DocumentFormat {
    Ppt,
    Word,
    Excel,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Ppt => "ppt",
            DocumentFormat::Word => "word",
            DocumentFormat::Excel => "excel",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ppt" => Ok(DocumentFormat::Ppt),
            "word" => Ok(DocumentFormat::Word),
            "excel" => Ok(DocumentFormat::Excel),
            "pdf" => Ok(DocumentFormat::Pdf),
            other => Err(format!("unsupported document format '{}'", other)),
        }
    }
}

/// The format travels as a free string so that unknown values reach the
/// generator and get the clarification reply instead of a 422.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateFileRequest {
    #[cfg_attr(feature = "openapi", schema(example = "create a presentation about fusion power"))]
    pub query: String,
    #[cfg_attr(feature = "openapi", schema(example = "ppt"))]
    pub file_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct FileSummary {
    pub title: String,
    pub author: String,
    pub item_count: usize,
    pub file_size: String,
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateFileReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub file_content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<FileSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct DownloadQuery {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
