//! Command Dispatch
//!
//! Turns a classified command into backend calls and normalizes the answer
//! into a [`Reply`]. Real-time queries take two stages: raw data from a
//! live source, then a rewrite by the text-generation service. If either
//! stage fails, the dispatcher falls back to a single direct chat call.

use crate::{
    backend::Backend,
    classifier::{self, Category, RealTimeKind},
    error::{BackendError, DispatchError},
    transcript::{Attachments, Download},
    wire::{CreateFileRequest, Source, UserLocation, WeatherRequest},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply text used when document generation fails outright.
pub const FILE_CREATION_FAILED: &str =
    "I encountered an error creating the file. Please try again with a different request.";

/// The normalized result of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub attachments: Attachments,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Attachments::default(),
        }
    }
}

/// Raw data gathered in the first real-time stage.
struct LiveData {
    text: String,
    sources: Vec<Source>,
}

/// Builds the prompt that asks the model to rewrite live data for the user.
pub fn polish_prompt(data: &str, command: &str) -> String {
    format!(
        "Based on this real-time data I gathered: \"{}\", please provide a clean, comprehensive, and well-structured response to the user's query: \"{}\". Make the response professional, informative, and easy to understand. Include relevant details and insights.",
        data, command
    )
}

pub struct Dispatcher {
    backend: Arc<dyn Backend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Routes `command` to the backend and returns the narrated reply.
    ///
    /// `location` is forwarded to weather lookups when the client shared one.
    pub async fn dispatch(
        &self,
        command: &str,
        location: Option<UserLocation>,
    ) -> Result<Reply, DispatchError> {
        let category = classifier::classify(command);
        info!(?category, "Dispatching command");

        let reply = match category {
            Category::FileCreation => self.create_file(command).await,
            Category::SystemControl => Reply::text(self.backend.system_control(command).await?),
            Category::SystemInfo => Reply::text(self.backend.system_info().await?),
            Category::RealTime(kind) => self.real_time(command, kind, location).await?,
            Category::GeneralChat => Reply::text(self.backend.chat(command).await?),
        };
        Ok(reply)
    }

    async fn create_file(&self, command: &str) -> Reply {
        let request = CreateFileRequest {
            query: command.to_string(),
            file_type: classifier::document_format(command).to_string(),
        };
        match self.backend.create_file(request).await {
            Ok(created) => {
                let download = match (created.download_url, created.file_name) {
                    (Some(url), Some(file_name)) => Some(Download { url, file_name }),
                    _ => None,
                };
                Reply {
                    text: created.response,
                    attachments: Attachments {
                        download,
                        sources: Vec::new(),
                        summary: created.summary,
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "File creation failed");
                Reply::text(FILE_CREATION_FAILED)
            }
        }
    }

    async fn real_time(
        &self,
        command: &str,
        kind: RealTimeKind,
        location: Option<UserLocation>,
    ) -> Result<Reply, BackendError> {
        match self.polished(command, kind, location).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = %e, ?kind, "Real-time lookup failed, falling back to direct chat");
                Ok(Reply::text(self.backend.chat(command).await?))
            }
        }
    }

    async fn polished(
        &self,
        command: &str,
        kind: RealTimeKind,
        location: Option<UserLocation>,
    ) -> Result<Reply, BackendError> {
        let data = self.fetch_live(command, kind, location).await?;
        debug!(bytes = data.text.len(), "Live data fetched, polishing");
        let text = self.backend.chat(&polish_prompt(&data.text, command)).await?;
        if text.trim().is_empty() {
            return Err(BackendError::InvalidResponse(
                "empty polished response".to_string(),
            ));
        }
        Ok(Reply {
            text,
            attachments: Attachments {
                sources: data.sources,
                ..Default::default()
            },
        })
    }

    async fn fetch_live(
        &self,
        command: &str,
        kind: RealTimeKind,
        location: Option<UserLocation>,
    ) -> Result<LiveData, BackendError> {
        if let Some(composite) = kind.composite_kind() {
            let text = self.backend.realtime(command, composite).await?;
            return Ok(LiveData {
                text,
                sources: Vec::new(),
            });
        }

        match kind {
            RealTimeKind::Weather => {
                let reply = self
                    .backend
                    .weather(WeatherRequest {
                        query: command.to_string(),
                        user_location: location,
                    })
                    .await?;
                Ok(LiveData {
                    text: reply.response,
                    sources: Vec::new(),
                })
            }
            RealTimeKind::News => {
                let reply = self.backend.news(command).await?;
                Ok(LiveData {
                    text: reply.response,
                    sources: reply.articles,
                })
            }
            _ => {
                let reply = self.backend.search(command).await?;
                Ok(LiveData {
                    text: reply.response,
                    sources: reply.sources,
                })
            }
        }
    }
}
