//! Web search, news and the composite real-time lookups.

use crate::upstream::{
    duckduckgo::DuckDuckGo,
    google::{CustomSearch, SearchItem},
};
use anyhow::{Result, anyhow};
use jarvis_core::wire::{NewsReply, RealtimeKind, SearchReply, Source};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

pub const DEFAULT_NEWS_TOPIC: &str = "technology";

static NEWS_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(jarvis|news|latest|about|get|me|the|current|on|what's|whats|any)\b")
        .expect("valid regex")
});
static SEARCH_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(jarvis|search|google|for|find)\b").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

fn strip(words: &Regex, query: &str) -> String {
    let lowered = query.to_lowercase();
    let stripped = words.replace_all(&lowered, "");
    WHITESPACE
        .replace_all(&stripped, " ")
        .trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .to_string()
}

/// The subject of a news request, defaulting to technology.
pub fn news_topic(query: &str) -> String {
    let topic = strip(&NEWS_WORDS, query);
    if topic.is_empty() {
        DEFAULT_NEWS_TOPIC.to_string()
    } else {
        topic
    }
}

/// The search terms of a "search for X" request.
pub fn search_terms(query: &str) -> String {
    strip(&SEARCH_WORDS, query)
}

fn numbered(items: &[SearchItem], limit: usize, with_source: bool) -> String {
    let mut text = String::new();
    for (index, item) in items.iter().take(limit).enumerate() {
        text.push_str(&format!("{}. **{}**\n", index + 1, item.title));
        if !item.snippet.is_empty() {
            text.push_str(&format!("{}\n", item.snippet));
        }
        if with_source {
            text.push_str(&format!("Source: {}\n", item.display_link));
        }
        text.push('\n');
    }
    text
}

/// Narrates Google web results, top three in the text and all as sources.
pub fn narrate_search(query: &str, items: Vec<SearchItem>, total_results: u64) -> SearchReply {
    if items.is_empty() {
        return SearchReply {
            response: format!(
                "I couldn't find any current information about \"{}\" on the web, Sir. Please try a different search term.",
                query
            ),
            ..Default::default()
        };
    }
    let mut response = format!(
        "Here's the latest information I found about \"{}\", Sir:\n\n",
        query
    );
    response.push_str(&numbered(&items, 3, true));
    response.push_str(
        "This information is current as of now. Would you like me to search for more specific details, Sir?",
    );
    SearchReply {
        response,
        sources: items.into_iter().map(Source::from).collect(),
        total_results,
    }
}

pub fn narrate_news(topic: &str, items: Vec<SearchItem>, total_results: u64) -> NewsReply {
    if items.is_empty() {
        return NewsReply {
            response: format!(
                "I couldn't find any recent news about \"{}\", Sir. Please try a different topic.",
                topic
            ),
            ..Default::default()
        };
    }
    let mut response = format!(
        "Here are the latest news headlines about {}, Sir:\n\n",
        topic
    );
    response.push_str(&numbered(&items, 4, true));
    response.push_str(
        "These are the most current news stories available. Would you like me to search for news on a different topic, Sir?",
    );
    NewsReply {
        response,
        articles: items.into_iter().map(Source::from).collect(),
        total_results,
    }
}

/// The Google query and result handling for each composite lookup.
struct Template {
    query: String,
    num: u8,
    sort_by_date: bool,
}

fn template(query: &str, kind: RealtimeKind) -> Template {
    let (query, num, sort_by_date) = match kind {
        RealtimeKind::Stock => (
            format!("{} stock price current real time", stock_symbol(query)),
            3,
            false,
        ),
        RealtimeKind::Crypto => (
            format!(
                "{} cryptocurrency price current USD real time",
                crypto_name(query)
            ),
            3,
            false,
        ),
        RealtimeKind::Sports => (format!("{} live score current game today", query), 3, false),
        RealtimeKind::Traffic => (
            format!("{} traffic conditions current real time", query),
            3,
            false,
        ),
        RealtimeKind::Trends => (format!("{} trending now current popular", query), 5, true),
        RealtimeKind::General => (format!("{} current real time latest", query), 5, true),
    };
    Template {
        query,
        num,
        sort_by_date,
    }
}

fn stock_symbol(query: &str) -> String {
    query
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .collect()
}

fn crypto_name(query: &str) -> String {
    query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Turns the results of a composite lookup into narrated text.
pub fn narrate_realtime(query: &str, kind: RealtimeKind, items: &[SearchItem]) -> String {
    let first = items.first().map(|item| item.snippet.as_str());
    match (kind, first) {
        (RealtimeKind::Stock, Some(snippet)) => format!(
            "Current stock information for {}, Sir: {}",
            stock_symbol(query),
            snippet
        ),
        (RealtimeKind::Stock, None) => format!(
            "I found limited information about {} stock, Sir. The markets may be closed or the symbol may be incorrect.",
            stock_symbol(query)
        ),
        (RealtimeKind::Crypto, Some(snippet)) => format!(
            "Current cryptocurrency information for {}, Sir: {}",
            crypto_name(query).to_uppercase(),
            snippet
        ),
        (RealtimeKind::Crypto, None) => format!(
            "I found limited information about {} cryptocurrency, Sir.",
            crypto_name(query)
        ),
        (RealtimeKind::Sports, Some(snippet)) => {
            format!("Current sports information about {}, Sir: {}", query, snippet)
        }
        (RealtimeKind::Sports, None) => format!(
            "I found limited current sports information about {}, Sir.",
            query
        ),
        (RealtimeKind::Traffic, Some(snippet)) => {
            format!("Current traffic conditions for {}, Sir: {}", query, snippet)
        }
        (RealtimeKind::Traffic, None) => format!(
            "I found limited current traffic information for {}, Sir.",
            query
        ),
        (RealtimeKind::Trends, Some(_)) => {
            let mut text = format!("Current trends about {}, Sir:\n\n", query);
            for (index, item) in items.iter().take(3).enumerate() {
                text.push_str(&format!("{}. {}\n{}\n\n", index + 1, item.title, item.snippet));
            }
            text
        }
        (RealtimeKind::Trends, None) => format!(
            "I found limited trending information about {}, Sir.",
            query
        ),
        (RealtimeKind::General, Some(_)) => format!(
            "Current real-time information about {}, Sir:\n\n{}",
            query,
            numbered(items, 3, true)
        ),
        (RealtimeKind::General, None) => format!(
            "I found limited current information about {}, Sir.",
            query
        ),
    }
}

/// Live search over Google, with DuckDuckGo for unkeyed web searches.
pub struct LiveSearch {
    web: Option<CustomSearch>,
    news: Option<CustomSearch>,
    duckduckgo: DuckDuckGo,
}

impl LiveSearch {
    pub fn new(web: Option<CustomSearch>, news: Option<CustomSearch>, duckduckgo: DuckDuckGo) -> Self {
        Self {
            web,
            news,
            duckduckgo,
        }
    }

    pub async fn web(&self, query: &str) -> Result<SearchReply> {
        if let Some(google) = &self.web {
            let results = google.search(query, 5, false).await?;
            info!(query, count = results.items.len(), "Google search answered");
            return Ok(narrate_search(query, results.items, results.total_results));
        }

        let terms = search_terms(query);
        debug!(%terms, "Google not configured, asking DuckDuckGo");
        let answer = self.duckduckgo.instant_answer(&terms).await?;
        let summary = answer
            .summary()
            .ok_or_else(|| anyhow!("DuckDuckGo has no instant answer for '{}'", terms))?;

        let sources = if answer.abstract_url.is_empty() {
            Vec::new()
        } else {
            vec![Source {
                title: answer.heading.clone(),
                url: answer.abstract_url.clone(),
                snippet: answer.abstract_text.clone(),
                source: "duckduckgo.com".to_string(),
            }]
        };
        Ok(SearchReply {
            response: format!("I searched for \"{}\". {}", terms, summary),
            total_results: sources.len() as u64,
            sources,
        })
    }

    pub async fn news(&self, query: &str) -> Result<NewsReply> {
        let google = self
            .news
            .as_ref()
            .ok_or_else(|| anyhow!("Google news search is not configured"))?;
        let topic = news_topic(query);
        let results = google.search(&topic, 5, true).await?;
        info!(%topic, count = results.items.len(), "Google news answered");
        Ok(narrate_news(&topic, results.items, results.total_results))
    }

    pub async fn realtime(&self, query: &str, kind: RealtimeKind) -> Result<String> {
        let google = self
            .web
            .as_ref()
            .ok_or_else(|| anyhow!("Google search is not configured"))?;
        let template = template(query, kind);
        let results = google
            .search(&template.query, template.num, template.sort_by_date)
            .await?;
        Ok(narrate_realtime(query, kind, &results.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::stub;
    use axum::{Json, Router, routing::get};
    use serde_json::{Value, json};

    async fn duckduckgo_answering(answer: Value) -> DuckDuckGo {
        let base = stub::serve(Router::new().route(
            "/",
            get(move || {
                let answer = answer.clone();
                async move { Json(answer) }
            }),
        ))
        .await;
        DuckDuckGo::with_base_url(reqwest::Client::new(), &base)
    }

    fn item(n: usize) -> SearchItem {
        SearchItem {
            title: format!("Headline {}", n),
            link: format!("https://news.example.com/{}", n),
            snippet: format!("Snippet {}", n),
            display_link: "news.example.com".to_string(),
        }
    }

    #[test]
    fn test_news_topic() {
        assert_eq!(news_topic("Jarvis, get me the latest news about Mars"), "mars");
        assert_eq!(news_topic("latest news"), DEFAULT_NEWS_TOPIC);
        // Whole words only: "meteorology" keeps its "me".
        assert_eq!(news_topic("news on meteorology"), "meteorology");
    }

    #[test]
    fn test_search_terms() {
        assert_eq!(search_terms("Jarvis, search for fusion reactors"), "fusion reactors");
        assert_eq!(search_terms("google information theory"), "information theory");
    }

    #[test]
    fn test_search_narration_lists_top_three() {
        let items: Vec<SearchItem> = (1..=5).map(item).collect();
        let reply = narrate_search("fusion", items, 42);
        assert!(reply.response.starts_with("Here's the latest information I found about \"fusion\", Sir:"));
        assert!(reply.response.contains("3. **Headline 3**"));
        assert!(!reply.response.contains("Headline 4"));
        assert_eq!(reply.sources.len(), 5);
        assert_eq!(reply.total_results, 42);
    }

    #[test]
    fn test_news_narration_lists_top_four() {
        let items: Vec<SearchItem> = (1..=5).map(item).collect();
        let reply = narrate_news("mars", items, 5);
        assert!(reply.response.contains("4. **Headline 4**"));
        assert!(!reply.response.contains("Headline 5"));
        assert_eq!(reply.articles[0].source, "news.example.com");
    }

    #[test]
    fn test_empty_results() {
        let reply = narrate_news("mars", Vec::new(), 0);
        assert!(reply.response.starts_with("I couldn't find any recent news about \"mars\""));
        assert!(reply.articles.is_empty());
    }

    #[test]
    fn test_realtime_templates() {
        let stock = template("aapl stock price", RealtimeKind::Stock);
        assert_eq!(stock.query, "AAPLSTOCKPRICE stock price current real time");
        assert_eq!(stock.num, 3);

        let trends = template("ai", RealtimeKind::Trends);
        assert_eq!(trends.query, "ai trending now current popular");
        assert!(trends.sort_by_date);
        assert_eq!(trends.num, 5);
    }

    #[test]
    fn test_realtime_narration() {
        let items = vec![item(1), item(2)];
        assert_eq!(
            narrate_realtime("btc crypto", RealtimeKind::Crypto, &items),
            "Current cryptocurrency information for BTCCRYPTO, Sir: Snippet 1"
        );
        assert_eq!(
            narrate_realtime("I-95", RealtimeKind::Traffic, &[]),
            "I found limited current traffic information for I-95, Sir."
        );
        let trends = narrate_realtime("ai", RealtimeKind::Trends, &items);
        assert!(trends.contains("2. Headline 2\nSnippet 2"));
    }

    #[tokio::test]
    async fn test_duckduckgo_without_answer_is_an_error() {
        let duckduckgo =
            duckduckgo_answering(json!({"Heading": "", "AbstractText": "", "Answer": ""})).await;
        let search = LiveSearch::new(None, None, duckduckgo);

        let err = search.web("search for zxqv").await.unwrap_err();
        assert!(err.to_string().contains("no instant answer for 'zxqv'"));
    }

    #[tokio::test]
    async fn test_duckduckgo_abstract_becomes_source() {
        let duckduckgo = duckduckgo_answering(json!({
            "Heading": "Tokamak",
            "AbstractText": "A device using magnetic fields to confine plasma.",
            "AbstractSource": "Wikipedia",
            "AbstractURL": "https://en.wikipedia.org/wiki/Tokamak"
        }))
        .await;
        let search = LiveSearch::new(None, None, duckduckgo);

        let reply = search.web("search for tokamak").await.unwrap();
        assert!(reply.response.starts_with("I searched for \"tokamak\". Here's what I found:"));
        assert_eq!(reply.total_results, 1);
        assert_eq!(reply.sources[0].url, "https://en.wikipedia.org/wiki/Tokamak");
    }

    #[tokio::test]
    async fn test_google_search_is_preferred() {
        let base = stub::serve(Router::new().route(
            "/customsearch/v1",
            get(|| async {
                Json(json!({
                    "searchInformation": {"totalResults": "2"},
                    "items": [
                        {"title": "Fusion milestone", "link": "https://a.example/1", "snippet": "Net energy gain", "displayLink": "a.example"},
                        {"title": "Fusion startups", "link": "https://b.example/2", "displayLink": "b.example"}
                    ]
                }))
            }),
        ))
        .await;
        let http = reqwest::Client::new();
        let google = CustomSearch::with_base_url(http.clone(), "key".into(), "cx".into(), &base);
        // DuckDuckGo points nowhere; it must not be consulted.
        let search = LiveSearch::new(
            Some(google),
            None,
            DuckDuckGo::with_base_url(http, "http://127.0.0.1:9"),
        );

        let reply = search.web("fusion").await.unwrap();
        assert_eq!(reply.total_results, 2);
        assert_eq!(reply.sources.len(), 2);
        assert!(reply.response.contains("1. **Fusion milestone**"));
    }
}
