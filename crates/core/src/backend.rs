//! The assistant's view of its backend services.
//!
//! `Backend` is the seam between the dispatcher and whatever answers the
//! JSON endpoints: `jarvis-api` implements it in-process, and
//! [`HttpBackend`] implements it by calling a running service over HTTP.

use crate::error::BackendError;
use crate::wire::{
    ChatRequest, CreateFileReply, CreateFileRequest, NewsReply, QueryRequest, RealtimeKind,
    RealtimeRequest, SearchReply, SystemControlRequest, TextReply, WeatherReply, WeatherRequest,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Free-form text generation in the assistant's persona.
    async fn chat(&self, message: &str) -> Result<String, BackendError>;

    /// Generates a document description and registers it for download.
    async fn create_file(
        &self,
        request: CreateFileRequest,
    ) -> Result<CreateFileReply, BackendError>;

    async fn search(&self, query: &str) -> Result<SearchReply, BackendError>;

    async fn news(&self, query: &str) -> Result<NewsReply, BackendError>;

    async fn weather(&self, request: WeatherRequest) -> Result<WeatherReply, BackendError>;

    /// Composite live-data lookup (stock, crypto, sports, traffic, trends).
    async fn realtime(&self, query: &str, kind: RealtimeKind) -> Result<String, BackendError>;

    async fn system_info(&self) -> Result<String, BackendError>;

    async fn system_control(&self, command: &str) -> Result<String, BackendError>;
}

/// A `Backend` that talks to a `jarvis-api` instance over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a backend rooted at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(path, "POST backend endpoint");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, BackendError> {
        debug!(path, "GET backend endpoint");
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<R>().await?);
        }

        // Failures carry the uniform `{response}` body; fall back to the raw text.
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TextReply>(&body)
            .map(|reply| reply.response)
            .unwrap_or(body);
        Err(error_for_status(status, message))
    }
}

/// Maps a failed status onto the error taxonomy.
pub(crate) fn error_for_status(status: StatusCode, message: String) -> BackendError {
    if status == StatusCode::SERVICE_UNAVAILABLE {
        BackendError::NotConfigured(message)
    } else {
        BackendError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, message: &str) -> Result<String, BackendError> {
        let body = ChatRequest {
            message: message.to_string(),
        };
        let reply: TextReply = self.post("chat", &body).await?;
        Ok(reply.response)
    }

    async fn create_file(
        &self,
        request: CreateFileRequest,
    ) -> Result<CreateFileReply, BackendError> {
        self.post("create-file", &request).await
    }

    async fn search(&self, query: &str) -> Result<SearchReply, BackendError> {
        let body = QueryRequest {
            query: query.to_string(),
        };
        self.post("search", &body).await
    }

    async fn news(&self, query: &str) -> Result<NewsReply, BackendError> {
        let body = QueryRequest {
            query: query.to_string(),
        };
        self.post("news", &body).await
    }

    async fn weather(&self, request: WeatherRequest) -> Result<WeatherReply, BackendError> {
        self.post("weather", &request).await
    }

    async fn realtime(&self, query: &str, kind: RealtimeKind) -> Result<String, BackendError> {
        let body = RealtimeRequest {
            query: query.to_string(),
            kind,
        };
        let reply: TextReply = self.post("realtime", &body).await?;
        Ok(reply.response)
    }

    async fn system_info(&self) -> Result<String, BackendError> {
        let reply: TextReply = self.get("system-info").await?;
        Ok(reply.response)
    }

    async fn system_control(&self, command: &str) -> Result<String, BackendError> {
        let body = SystemControlRequest {
            command: command.to_string(),
        };
        let reply: TextReply = self.post("system-control", &body).await?;
        Ok(reply.response)
    }
}
