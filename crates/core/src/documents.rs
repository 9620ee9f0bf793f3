//! Document Generation Service
//!
//! Asks the text-generation service for a structured JSON description of a
//! presentation, document, spreadsheet or report, registers the result in
//! an in-memory [`FileStore`], and builds the narrated reply with a
//! download reference.

use crate::{
    llm_client::{GenerationOptions, TextGenerator},
    wire::{CreateFileReply, DocumentFormat, FileSummary},
};
use chrono::Utc;
use regex::Regex;
use serde_json::{Value, json};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, LazyLock},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const DEFAULT_AUTHOR: &str = "JARVIS AI Assistant";

pub const MISSING_TOPIC: &str = "Please specify what you'd like me to create a file about, Sir.";

pub const UNSUPPORTED_FORMAT: &str = "I can create PowerPoint presentations, Word documents, Excel spreadsheets, and PDF reports for you, Sir. Please specify the file type.";

static COMMAND_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(jarvis|create|make|generate|presentation|document|file|ppt|powerpoint|word|excel|spreadsheet|pdf|report)\b",
    )
    .expect("valid regex")
});
static FILLER_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(about|on|for|the|a|an)\b").expect("valid regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Missing prompt template: '{0}'")]
    MissingPrompt(String),
    #[error(transparent)]
    Generation(#[from] anyhow::Error),
}

/// A generated file kept for download.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub content: Value,
    pub format: DocumentFormat,
}

/// How many generated files are kept before the oldest are evicted.
pub const MAX_STORED_FILES: usize = 100;

/// Non-persistent storage for generated files, keyed by file name.
///
/// Holds at most `capacity` files; inserting beyond that drops the oldest.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Mutex<StoredFiles>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct StoredFiles {
    files: HashMap<String, StoredFile>,
    order: VecDeque<String>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::with_capacity(MAX_STORED_FILES)
    }
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoredFiles::default())),
            capacity: capacity.max(1),
        }
    }

    pub async fn insert(&self, file_name: String, file: StoredFile) {
        let mut stored = self.inner.lock().await;
        if stored.files.insert(file_name.clone(), file).is_none() {
            stored.order.push_back(file_name);
        }
        while stored.order.len() > self.capacity {
            if let Some(evicted) = stored.order.pop_front() {
                stored.files.remove(&evicted);
                info!(file_name = %evicted, "Evicted generated file");
            }
        }
    }

    pub async fn get(&self, file_name: &str) -> Option<StoredFile> {
        self.inner.lock().await.files.get(file_name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.files.len()
    }
}

/// Reduces a spoken request to its subject, e.g.
/// "Jarvis, create a presentation about solar power!" → "solar power".
pub fn extract_topic(query: &str) -> String {
    let lowered = query.to_lowercase();
    let stripped = COMMAND_WORDS.replace_all(&lowered, "");
    let stripped = FILLER_WORDS.replace_all(&stripped, "");
    let stripped = PUNCTUATION.replace_all(&stripped, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

fn prompt_key(format: DocumentFormat) -> String {
    format!("document_{}", format.as_str())
}

fn request_prompt(format: DocumentFormat, topic: &str) -> String {
    match format {
        DocumentFormat::Ppt => format!(
            "Create a comprehensive PowerPoint presentation about: {}. Include current statistics, real-time insights, market data, and professional analysis.",
            topic
        ),
        DocumentFormat::Word => format!(
            "Create a comprehensive Word document about: {}. Include current market data, statistics, analysis, and professional insights.",
            topic
        ),
        DocumentFormat::Excel => format!(
            "Create a comprehensive Excel spreadsheet about: {}. Include real data, calculations, trends, and professional analysis.",
            topic
        ),
        DocumentFormat::Pdf => format!(
            "Create a comprehensive PDF report about: {}. Include current data, market analysis, statistics, and professional recommendations.",
            topic
        ),
    }
}

/// Parses the model output as a JSON object, tolerating a Markdown fence.
fn parse_content(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    match serde_json::from_str::<Value>(unfenced.trim()) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

fn fallback_content(topic: &str, format: DocumentFormat, text: &str) -> Value {
    let mut chars = topic.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    json!({
        "title": format!(
            "{} - Professional {} Analysis",
            capitalized,
            format.as_str().to_uppercase()
        ),
        "author": DEFAULT_AUTHOR,
        "date": Utc::now().format("%m/%d/%Y").to_string(),
        "content": text,
        "generated": true,
    })
}

fn array_len(content: &Value, key: &str) -> usize {
    content.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

fn narrative(format: DocumentFormat, topic: &str, content: &Value) -> String {
    let mut response = format!(
        "Certainly, Sir. I've created a comprehensive {} file about \"{}\" for you. ",
        format.as_str().to_uppercase(),
        topic
    );
    response.push_str(&match format {
        DocumentFormat::Ppt => format!(
            "The presentation contains {} professionally designed slides with detailed content, current market insights, and statistical analysis. ",
            array_len(content, "slides")
        ),
        DocumentFormat::Word => format!(
            "The document contains {} detailed sections with comprehensive analysis, current data, and professional insights. ",
            array_len(content, "sections")
        ),
        DocumentFormat::Excel => format!(
            "The spreadsheet contains {} sheets with real data, calculations, and trend analysis. ",
            array_len(content, "sheets")
        ),
        DocumentFormat::Pdf => format!(
            "The report contains {} comprehensive sections with current market data and professional recommendations. ",
            array_len(content, "sections")
        ),
    });
    response.push_str(
        "The file is ready for download and fully compatible with Microsoft Office tools. You can access it immediately, Sir.",
    );
    response
}

fn summarize(format: DocumentFormat, content: &Value) -> FileSummary {
    let item_count = ["slides", "sections", "sheets"]
        .iter()
        .map(|key| array_len(content, key))
        .find(|&n| n > 0)
        .unwrap_or(0);
    let bytes = content.to_string().len();
    FileSummary {
        title: content
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        author: content
            .get("author")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_AUTHOR)
            .to_string(),
        item_count,
        file_size: format!("{}KB", (bytes as f64 / 1024.0).round() as u64),
        format: format.as_str().to_uppercase(),
    }
}

/// Builds a download-safe file name from the topic.
pub fn file_name_for(topic: &str, format: DocumentFormat, millis: i64) -> String {
    let clean: String = topic
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.{}", clean, millis, format.as_str())
}

pub fn download_url_for(file_name: &str, format: DocumentFormat) -> String {
    format!(
        "/api/download-file?file={}&type={}",
        file_name,
        format.as_str()
    )
}

pub struct DocumentGenerator {
    generator: Arc<dyn TextGenerator>,
    prompts: HashMap<String, String>,
    store: FileStore,
}

impl DocumentGenerator {
    /// Creates a generator.
    ///
    /// `prompts` must contain a system prompt per format under
    /// `document_ppt`, `document_word`, `document_excel` and `document_pdf`;
    /// `{date}` in a template is replaced with today's date.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: HashMap<String, String>,
        store: FileStore,
    ) -> Self {
        Self {
            generator,
            prompts,
            store,
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Generates a document for `query` in the format named by `file_type`.
    ///
    /// A missing topic or an unknown format yields a clarification reply
    /// without calling the text-generation service.
    pub async fn create(
        &self,
        query: &str,
        file_type: &str,
    ) -> Result<CreateFileReply, DocumentError> {
        let topic = extract_topic(query);
        if topic.is_empty() {
            return Ok(CreateFileReply {
                response: MISSING_TOPIC.to_string(),
                ..Default::default()
            });
        }

        let Ok(format) = file_type.parse::<DocumentFormat>() else {
            info!(file_type, "Unsupported document format requested");
            return Ok(CreateFileReply {
                response: UNSUPPORTED_FORMAT.to_string(),
                ..Default::default()
            });
        };

        let key = prompt_key(format);
        let system_prompt = self
            .prompts
            .get(&key)
            .ok_or_else(|| DocumentError::MissingPrompt(key.clone()))?
            .replace("{date}", &Utc::now().format("%m/%d/%Y").to_string());

        let text = self
            .generator
            .generate(
                &system_prompt,
                &request_prompt(format, &topic),
                GenerationOptions::DOCUMENT,
            )
            .await?;

        let content = parse_content(&text).unwrap_or_else(|| {
            warn!(%topic, "Generated document was not valid JSON, storing raw text");
            fallback_content(&topic, format, &text)
        });

        let file_name = file_name_for(&topic, format, Utc::now().timestamp_millis());
        let download_url = download_url_for(&file_name, format);
        self.store
            .insert(
                file_name.clone(),
                StoredFile {
                    content: content.clone(),
                    format,
                },
            )
            .await;
        info!(%file_name, %format, "Document generated");

        Ok(CreateFileReply {
            response: narrative(format, &topic, &content),
            download_url: Some(download_url),
            file_name: Some(file_name),
            summary: Some(summarize(format, &content)),
            file_content: Some(content),
        })
    }
}
