//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{handlers, state::AppState, ws::ws_handler};

use axum::{
    Router,
    routing::{get, post},
};
use jarvis_core::wire::{
    ChatRequest, Coordinates, CreateFileReply, CreateFileRequest, FileSummary, NewsReply,
    QueryRequest, RealtimeKind, RealtimeRequest, SearchReply, Source, SystemControlRequest,
    TextReply, UserLocation, WeatherData, WeatherReply, WeatherRequest,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::chat,
        handlers::create_file,
        handlers::download_file,
        handlers::search,
        handlers::news,
        handlers::weather,
        handlers::realtime,
        handlers::system_info,
        handlers::system_control,
    ),
    components(
        schemas(
            TextReply, ChatRequest, CreateFileRequest, CreateFileReply, FileSummary,
            QueryRequest, SearchReply, NewsReply, Source, WeatherRequest, WeatherReply,
            WeatherData, Coordinates, UserLocation, RealtimeRequest, RealtimeKind,
            SystemControlRequest
        )
    ),
    tags(
        (name = "JARVIS API", description = "Chat, documents and live data for the JARVIS assistant")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/create-file", post(handlers::create_file))
        .route("/api/download-file", get(handlers::download_file))
        .route("/api/search", post(handlers::search))
        .route("/api/news", post(handlers::news))
        .route("/api/weather", post(handlers::weather))
        .route("/api/realtime", post(handlers::realtime))
        .route("/api/system-info", get(handlers::system_info))
        .route("/api/system-control", post(handlers::system_control))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tests::{EchoGenerator, services, test_config};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use jarvis_core::{error::NOT_CONFIGURED_MESSAGE, llm_client::TextGenerator};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router(generator: Option<Arc<dyn TextGenerator>>) -> Router {
        create_router(Arc::new(AppState {
            services: Arc::new(services(generator)),
            config: Arc::new(test_config()),
        }))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_without_key_is_service_unavailable() {
        let (status, body) = send(
            router(None),
            post_json("/api/chat", json!({"message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["response"], NOT_CONFIGURED_MESSAGE);
    }

    #[tokio::test]
    async fn test_chat_replies() {
        let (status, body) = send(
            router(Some(Arc::new(EchoGenerator))),
            post_json("/api/chat", json!({"message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "echo: hello");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let (status, body) = send(
            router(Some(Arc::new(EchoGenerator))),
            post_json("/api/chat", json!({"message": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["response"].as_str().unwrap().contains("message"));
    }

    #[tokio::test]
    async fn test_system_info() {
        let request = Request::get("/api/system-info").body(Body::empty()).unwrap();
        let (status, body) = send(router(None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            body["response"]
                .as_str()
                .unwrap()
                .starts_with("System Status Report:")
        );
    }

    #[tokio::test]
    async fn test_created_file_can_be_downloaded() {
        let router = router(Some(Arc::new(EchoGenerator)));
        let (status, body) = send(
            router.clone(),
            post_json(
                "/api/create-file",
                json!({"query": "create a pdf about tides", "fileType": "pdf"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["downloadUrl"].as_str().unwrap().to_string();
        let file_name = body["fileName"].as_str().unwrap().to_string();

        let response = router
            .oneshot(Request::get(url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains(&file_name));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let content: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(content, body["fileContent"]);
    }

    #[tokio::test]
    async fn test_download_unknown_file_is_not_found() {
        let request = Request::get("/api/download-file?file=missing.pdf&type=pdf")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(None), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["response"].as_str().unwrap().contains("missing.pdf"));
    }

    #[tokio::test]
    async fn test_realtime_accepts_unknown_type() {
        let (status, body) = send(
            router(Some(Arc::new(EchoGenerator))),
            post_json("/api/realtime", json!({"query": "tides", "type": "weather"})),
        )
        .await;
        assert_ne!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["response"].is_string());
    }

    #[test]
    fn test_openapi_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/chat",
            "/api/create-file",
            "/api/download-file",
            "/api/search",
            "/api/news",
            "/api/weather",
            "/api/realtime",
            "/api/system-info",
            "/api/system-control",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
