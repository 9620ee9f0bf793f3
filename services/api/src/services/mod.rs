//! In-process implementation of the assistant's backend.
//!
//! [`Services`] answers every `Backend` operation directly, so the HTTP
//! handlers and the WebSocket sessions share one code path.

pub mod search;
pub mod system;
pub mod weather;

use crate::{
    config::Config,
    upstream::{
        duckduckgo::DuckDuckGo,
        google::{CustomSearch, Geocoder},
        open_meteo::OpenMeteo,
        openweather::OpenWeather,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use jarvis_core::{
    backend::Backend,
    documents::{DocumentError, DocumentGenerator, FileStore},
    error::{BackendError, NOT_CONFIGURED_MESSAGE},
    llm_client::{GenerationOptions, TextGenerator},
    wire::{
        CreateFileReply, CreateFileRequest, NewsReply, RealtimeKind, SearchReply, WeatherReply,
        WeatherRequest,
    },
};
use search::LiveSearch;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{info, warn};
use weather::WeatherService;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn upstream_error(err: anyhow::Error) -> BackendError {
    BackendError::Transport(format!("{:#}", err))
}

pub struct Services {
    generator: Option<Arc<dyn TextGenerator>>,
    system_prompt: String,
    documents: Option<DocumentGenerator>,
    files: FileStore,
    search: LiveSearch,
    weather: WeatherService,
}

impl Services {
    /// Wires the services from configuration.
    ///
    /// `generator` is `None` when no LLM key is configured; `prompts` must
    /// contain `system_prompt` and the `document_*` templates.
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        mut prompts: HashMap<String, String>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let system_prompt = prompts
            .remove("system_prompt")
            .context("system_prompt.md not found in prompts directory")?;

        let google = &config.google;
        let engine = |engine_id: &Option<String>| match (&google.api_key, engine_id) {
            (Some(key), Some(cx)) => Some(CustomSearch::new(http.clone(), key.clone(), cx.clone())),
            _ => None,
        };
        let web = engine(&google.search_engine_id);
        let news = engine(&google.news_search_engine_id);
        let geocoder = google
            .maps_api_key
            .clone()
            .map(|key| Geocoder::new(http.clone(), key));
        let openweather = config
            .openweather_api_key
            .clone()
            .map(|key| OpenWeather::new(http.clone(), key));

        info!(
            llm = generator.is_some(),
            google_search = web.is_some(),
            google_news = news.is_some(),
            google_maps = geocoder.is_some(),
            openweather = openweather.is_some(),
            "Upstream services configured"
        );

        let files = FileStore::new();
        Ok(Self {
            documents: generator
                .clone()
                .map(|g| DocumentGenerator::new(g, prompts, files.clone())),
            generator,
            system_prompt,
            files,
            weather: WeatherService::new(
                OpenMeteo::new(http.clone()),
                geocoder,
                openweather,
                web.clone(),
            ),
            search: LiveSearch::new(web, news, DuckDuckGo::new(http)),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_search(mut self, search: LiveSearch) -> Self {
        self.search = search;
        self
    }

    /// Generated files, for the download endpoint.
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    fn generator(&self) -> Result<&Arc<dyn TextGenerator>, BackendError> {
        self.generator
            .as_ref()
            .ok_or_else(|| BackendError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()))
    }

    /// Answers from model knowledge when a live source is unavailable.
    async fn chat_fallback(&self, prompt: String, service: &str) -> Result<String, BackendError> {
        let text = self.chat(&prompt).await?;
        Ok(format!(
            "{}\n\n(Note: Using AI knowledge as {} is temporarily unavailable)",
            text, service
        ))
    }
}

#[async_trait]
impl Backend for Services {
    async fn chat(&self, message: &str) -> Result<String, BackendError> {
        let generator = self.generator()?;
        info!(chars = message.len(), "Processing chat message");
        generator
            .generate(&self.system_prompt, message, GenerationOptions::CHAT)
            .await
            .map_err(upstream_error)
    }

    async fn create_file(
        &self,
        request: CreateFileRequest,
    ) -> Result<CreateFileReply, BackendError> {
        self.generator()?;
        let Some(documents) = &self.documents else {
            return Err(BackendError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()));
        };
        documents
            .create(&request.query, &request.file_type)
            .await
            .map_err(|e| match e {
                DocumentError::MissingPrompt(_) => BackendError::Status {
                    status: 500,
                    message: e.to_string(),
                },
                DocumentError::Generation(e) => upstream_error(e),
            })
    }

    async fn search(&self, query: &str) -> Result<SearchReply, BackendError> {
        match self.search.web(query).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = ?e, "Live search failed, answering from model knowledge");
                let response = self
                    .chat_fallback(
                        format!(
                            "Search and provide the most current, up-to-date information about: {}. Include recent developments, current statistics, and latest news. Be comprehensive and detailed.",
                            query
                        ),
                        "Google Search",
                    )
                    .await?;
                Ok(SearchReply {
                    response,
                    ..Default::default()
                })
            }
        }
    }

    async fn news(&self, query: &str) -> Result<NewsReply, BackendError> {
        match self.search.news(query).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = ?e, "News search failed, answering from model knowledge");
                let response = self
                    .chat_fallback(
                        format!(
                            "Provide the latest current news and recent developments about: {}. Include recent headlines, key events, current trends, and breaking news. Be comprehensive and up-to-date.",
                            search::news_topic(query)
                        ),
                        "Google News",
                    )
                    .await?;
                Ok(NewsReply {
                    response,
                    ..Default::default()
                })
            }
        }
    }

    async fn weather(&self, request: WeatherRequest) -> Result<WeatherReply, BackendError> {
        self.weather.lookup(request).await.map_err(upstream_error)
    }

    async fn realtime(&self, query: &str, kind: RealtimeKind) -> Result<String, BackendError> {
        self.search
            .realtime(query, kind)
            .await
            .map_err(upstream_error)
    }

    async fn system_info(&self) -> Result<String, BackendError> {
        Ok(system::status_report(&mut rand::rng()))
    }

    async fn system_control(&self, command: &str) -> Result<String, BackendError> {
        Ok(system::control_reply(command))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{GoogleConfig, Provider};
    use anyhow::Result;
    use std::path::PathBuf;

    /// Echoes the prompt. Fails on "explode" and never finishes a story.
    pub(crate) struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            prompt: &str,
            _options: GenerationOptions,
        ) -> Result<String> {
            if prompt.contains("explode") {
                anyhow::bail!("model unavailable");
            }
            if prompt.contains("story") {
                std::future::pending::<()>().await;
            }
            Ok(format!("echo: {}", prompt))
        }
    }

    pub(crate) fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider: Provider::OpenAI,
            openai_api_key: None,
            gemini_api_key: None,
            chat_model: "gpt-4o-mini".into(),
            log_level: tracing::Level::INFO,
            prompts_path: PathBuf::from("./prompts"),
            google: GoogleConfig::default(),
            openweather_api_key: None,
        }
    }

    pub(crate) fn test_prompts() -> HashMap<String, String> {
        let mut prompts: HashMap<String, String> = ["ppt", "word", "excel", "pdf"]
            .iter()
            .map(|f| (format!("document_{}", f), format!("Return {} JSON", f)))
            .collect();
        prompts.insert("system_prompt".into(), "You are JARVIS.".into());
        prompts
    }

    pub(crate) fn services(generator: Option<Arc<dyn TextGenerator>>) -> Services {
        Services::new(generator, test_prompts(), &test_config()).unwrap()
    }

    #[test]
    fn test_system_prompt_is_required() {
        let err = Services::new(None, HashMap::new(), &test_config())
            .err()
            .unwrap();
        assert!(err.to_string().contains("system_prompt.md"));
    }

    #[tokio::test]
    async fn test_chat_without_key_is_not_configured() {
        let services = services(None);
        let err = services.chat("hello").await.unwrap_err();
        assert_eq!(
            err,
            BackendError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string())
        );

        let err = services
            .create_file(CreateFileRequest {
                query: "create a pdf about tides".into(),
                file_type: "pdf".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_chat_uses_generator() {
        let services = services(Some(Arc::new(EchoGenerator)));
        assert_eq!(services.chat("hello").await.unwrap(), "echo: hello");

        let err = services.chat("explode").await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(msg) if msg.contains("model unavailable")));
    }

    #[tokio::test]
    async fn test_news_without_google_falls_back_to_chat() {
        let services = services(Some(Arc::new(EchoGenerator)));
        let reply = services.news("latest news about Mars").await.unwrap();
        assert!(reply.response.contains("about: mars"));
        assert!(reply.response.ends_with(
            "(Note: Using AI knowledge as Google News is temporarily unavailable)"
        ));
        assert!(reply.articles.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_instant_answer_falls_back_to_chat() {
        use crate::upstream::stub;
        use axum::{Json, Router, routing::get};

        let base = stub::serve(Router::new().route(
            "/",
            get(|| async { Json(serde_json::json!({"AbstractText": ""})) }),
        ))
        .await;
        let duckduckgo = DuckDuckGo::with_base_url(reqwest::Client::new(), &base);
        let services = services(Some(Arc::new(EchoGenerator)))
            .with_search(LiveSearch::new(None, None, duckduckgo));

        let reply = services.search("search for zxqv").await.unwrap();
        assert!(reply.response.starts_with("echo: Search and provide the most current"));
        assert!(reply.response.ends_with(
            "(Note: Using AI knowledge as Google Search is temporarily unavailable)"
        ));
        assert!(reply.sources.is_empty());
    }

    #[tokio::test]
    async fn test_realtime_without_google_is_an_error() {
        let services = services(Some(Arc::new(EchoGenerator)));
        let err = services
            .realtime("AAPL", RealtimeKind::Stock)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[tokio::test]
    async fn test_documents_are_stored_for_download() {
        let services = services(Some(Arc::new(EchoGenerator)));
        let reply = services
            .create_file(CreateFileRequest {
                query: "create a word document about tides".into(),
                file_type: "word".into(),
            })
            .await
            .unwrap();
        let file_name = reply.file_name.unwrap();
        assert!(services.files().get(&file_name).await.is_some());
    }

    #[tokio::test]
    async fn test_system_routes_are_canned() {
        let services = services(None);
        assert!(
            services
                .system_info()
                .await
                .unwrap()
                .starts_with("System Status Report:")
        );
        assert_eq!(
            services.system_control("open notepad").await.unwrap(),
            "Launching Notepad for you."
        );
    }
}
