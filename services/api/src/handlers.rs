//! Axum Handlers for the REST API
//!
//! One handler per assistant endpoint. Every body, including errors, is JSON
//! with a narrated `response` field. Handlers use `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use jarvis_core::{
    backend::Backend,
    error::BackendError,
    wire::{
        ChatRequest, CreateFileReply, CreateFileRequest, DownloadQuery, NewsReply, QueryRequest,
        RealtimeRequest, SearchReply, SystemControlRequest, TextReply, WeatherReply,
        WeatherRequest,
    },
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::state::AppState;

const FILE_FAILED: &str = "I apologize, Sir. I encountered an error while creating the file. Please try again with a different topic or file type.";
const SEARCH_FAILED: &str =
    "I apologize, Sir. I'm having trouble accessing real-time web data at the moment. Please try again later.";
const NEWS_FAILED: &str =
    "I apologize, Sir. I'm having trouble accessing current news data. Please try again later.";
const WEATHER_FAILED: &str = "I'm having trouble retrieving current weather data, Sir. Please try again later or ask about a different location.";
const REALTIME_FAILED: &str =
    "I'm having trouble accessing real-time data at the moment, Sir. Please try again later.";

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// A required credential is missing; the message is narrated as is.
    NotConfigured(String),
    /// An upstream call failed; `message` is what the user hears.
    Upstream {
        message: String,
        cause: BackendError,
    },
    InternalServerError(anyhow::Error),
}

impl ApiError {
    /// Maps a backend failure onto a response narrated with `message`.
    fn upstream(message: &str) -> impl FnOnce(BackendError) -> ApiError + '_ {
        move |cause| match cause {
            BackendError::NotConfigured(message) => ApiError::NotConfigured(message),
            cause => ApiError::Upstream {
                message: message.to_string(),
                cause,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::NotConfigured(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::Upstream { message, cause } => {
                warn!(error = %cause, "Upstream request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };
        (status, Json(TextReply::new(message))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn require(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("`{}` must not be empty", field)));
    }
    Ok(())
}

/// Free-form conversation with the assistant.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = TextReply),
        (status = 400, description = "Empty message", body = TextReply),
        (status = 503, description = "Text generation is not configured", body = TextReply),
        (status = 500, description = "Text generation failed", body = TextReply)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<TextReply>, ApiError> {
    require(&payload.message, "message")?;
    let response = state
        .services
        .chat(&payload.message)
        .await
        .map_err(|cause| match cause {
            BackendError::NotConfigured(message) => ApiError::NotConfigured(message),
            cause => ApiError::Upstream {
                message: format!(
                    "I apologize, Sir. I'm experiencing technical difficulties at the moment. Error: {}. Please allow me a moment to recalibrate my systems.",
                    cause
                ),
                cause,
            },
        })?;
    Ok(Json(TextReply::new(response)))
}

/// Generate a document description and register it for download.
#[utoipa::path(
    post,
    path = "/api/create-file",
    request_body = CreateFileRequest,
    responses(
        (status = 200, description = "File created, or a clarification", body = CreateFileReply),
        (status = 503, description = "Text generation is not configured", body = TextReply),
        (status = 500, description = "Generation failed", body = TextReply)
    )
)]
pub async fn create_file(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateFileRequest>,
) -> Result<Json<CreateFileReply>, ApiError> {
    let reply = state
        .services
        .create_file(payload)
        .await
        .map_err(ApiError::upstream(FILE_FAILED))?;
    Ok(Json(reply))
}

/// Download a previously generated file as JSON.
#[utoipa::path(
    get,
    path = "/api/download-file",
    params(DownloadQuery),
    responses(
        (status = 200, description = "The file content as a JSON attachment"),
        (status = 400, description = "Format does not match the file", body = TextReply),
        (status = 404, description = "Unknown file", body = TextReply)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let file = state
        .services
        .files()
        .get(&query.file)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("File '{}' not found, Sir.", query.file)))?;

    if let Some(kind) = &query.kind {
        if !kind.eq_ignore_ascii_case(file.format.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "File '{}' is a {} file, not {}.",
                query.file, file.format, kind
            )));
        }
    }

    let body = serde_json::to_vec_pretty(&file.content)?;
    let disposition = format!("attachment; filename=\"{}.json\"", query.file);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Live web search.
#[utoipa::path(
    post,
    path = "/api/search",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Search results", body = SearchReply),
        (status = 400, description = "Empty query", body = TextReply),
        (status = 500, description = "Search failed", body = TextReply)
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<SearchReply>, ApiError> {
    require(&payload.query, "query")?;
    let reply = state
        .services
        .search(&payload.query)
        .await
        .map_err(ApiError::upstream(SEARCH_FAILED))?;
    Ok(Json(reply))
}

/// Latest news headlines on a topic.
#[utoipa::path(
    post,
    path = "/api/news",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Headlines", body = NewsReply),
        (status = 500, description = "News lookup failed", body = TextReply)
    )
)]
pub async fn news(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<NewsReply>, ApiError> {
    let reply = state
        .services
        .news(&payload.query)
        .await
        .map_err(ApiError::upstream(NEWS_FAILED))?;
    Ok(Json(reply))
}

/// Current weather for a named place or the client's location.
#[utoipa::path(
    post,
    path = "/api/weather",
    request_body = WeatherRequest,
    responses(
        (status = 200, description = "Weather report", body = WeatherReply),
        (status = 500, description = "Weather lookup failed", body = TextReply)
    )
)]
pub async fn weather(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WeatherRequest>,
) -> Result<Json<WeatherReply>, ApiError> {
    let reply = state
        .services
        .weather(payload)
        .await
        .map_err(ApiError::upstream(WEATHER_FAILED))?;
    Ok(Json(reply))
}

/// Stock, crypto, sports, traffic, trends and general live lookups.
#[utoipa::path(
    post,
    path = "/api/realtime",
    request_body = RealtimeRequest,
    responses(
        (status = 200, description = "Narrated live data", body = TextReply),
        (status = 400, description = "Empty query", body = TextReply),
        (status = 500, description = "Lookup failed", body = TextReply)
    )
)]
pub async fn realtime(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RealtimeRequest>,
) -> Result<Json<TextReply>, ApiError> {
    require(&payload.query, "query")?;
    let response = state
        .services
        .realtime(&payload.query, payload.kind)
        .await
        .map_err(ApiError::upstream(REALTIME_FAILED))?;
    Ok(Json(TextReply::new(response)))
}

/// Simulated system status report.
#[utoipa::path(
    get,
    path = "/api/system-info",
    responses(
        (status = 200, description = "Status report", body = TextReply)
    )
)]
pub async fn system_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TextReply>, ApiError> {
    let response = state
        .services
        .system_info()
        .await
        .map_err(ApiError::upstream("Unable to retrieve system information at this time."))?;
    Ok(Json(TextReply::new(response)))
}

/// Simulated application launch.
#[utoipa::path(
    post,
    path = "/api/system-control",
    request_body = SystemControlRequest,
    responses(
        (status = 200, description = "Canned confirmation", body = TextReply)
    )
)]
pub async fn system_control(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SystemControlRequest>,
) -> Result<Json<TextReply>, ApiError> {
    let response = state
        .services
        .system_control(&payload.command)
        .await
        .map_err(ApiError::upstream("I'm unable to execute system commands at the moment."))?;
    Ok(Json(TextReply::new(response)))
}
