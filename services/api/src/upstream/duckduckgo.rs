//! DuckDuckGo Instant Answer API, used for search when Google is not keyed.

use super::json_or_status;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://api.duckduckgo.com";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstantAnswer {
    #[serde(default)]
    pub heading: String,
    #[serde(default, rename = "AbstractText")]
    pub abstract_text: String,
    #[serde(default)]
    pub abstract_source: String,
    #[serde(default, rename = "AbstractURL")]
    pub abstract_url: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub definition_source: String,
    #[serde(default)]
    pub answer: String,
}

impl InstantAnswer {
    /// A one-paragraph summary, if the answer carries anything usable.
    pub fn summary(&self) -> Option<String> {
        if !self.abstract_text.is_empty() {
            Some(with_source(
                &format!("Here's what I found: {}", self.abstract_text),
                &self.abstract_source,
            ))
        } else if !self.definition.is_empty() {
            Some(with_source(
                &format!("Definition: {}", self.definition),
                &self.definition_source,
            ))
        } else if !self.answer.is_empty() {
            Some(format!("Answer: {}", self.answer))
        } else {
            None
        }
    }
}

fn with_source(text: &str, source: &str) -> String {
    if source.is_empty() {
        text.to_string()
    } else {
        format!("{} (Source: {})", text, source)
    }
}

#[derive(Clone)]
pub struct DuckDuckGo {
    http: Client,
    base_url: String,
}

impl DuckDuckGo {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn instant_answer(&self, query: &str) -> Result<InstantAnswer> {
        let response = self
            .http
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .context("Failed to reach DuckDuckGo")?;
        json_or_status("DuckDuckGo", response).await
    }
}
