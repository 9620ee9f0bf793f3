//! Command Classification
//!
//! Keyword routing for raw user input. Each classifier is an ordered table
//! of `(keywords, outcome)` rules evaluated top to bottom; the first rule
//! with a keyword contained in the lowercased input wins. Keeping the tables
//! as data makes the priority order explicit and testable on its own.

use crate::wire::{DocumentFormat, RealtimeKind};

/// Top-level routing decision for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    FileCreation,
    SystemControl,
    SystemInfo,
    RealTime(RealTimeKind),
    GeneralChat,
}

/// Which live data source a real-time query needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealTimeKind {
    Weather,
    News,
    Stock,
    Crypto,
    Sports,
    Traffic,
    Trending,
    GeneralSearch,
}

impl RealTimeKind {
    /// The composite real-time endpoint type for kinds it serves.
    ///
    /// Weather, news and general search have dedicated endpoints.
    pub fn composite_kind(&self) -> Option<RealtimeKind> {
        match self {
            RealTimeKind::Stock => Some(RealtimeKind::Stock),
            RealTimeKind::Crypto => Some(RealtimeKind::Crypto),
            RealTimeKind::Sports => Some(RealtimeKind::Sports),
            RealTimeKind::Traffic => Some(RealtimeKind::Traffic),
            RealTimeKind::Trending => Some(RealtimeKind::Trends),
            RealTimeKind::Weather | RealTimeKind::News | RealTimeKind::GeneralSearch => None,
        }
    }
}

/// Session control words understood before normal routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlIntent {
    Resume,
    Cancel,
}

/// Top-level categories that are not real-time; real-time is resolved by
/// [`REAL_TIME_TRIGGERS`] and then [`REAL_TIME_RULES`].
#[derive(Debug, Clone, Copy)]
enum Route {
    FileCreation,
    SystemControl,
    SystemInfo,
    RealTime,
}

const CATEGORY_RULES: &[(&[&str], Route)] = &[
    (&["create", "make", "generate"], Route::FileCreation),
    (&["open", "launch"], Route::SystemControl),
    (&["system", "status"], Route::SystemInfo),
    (REAL_TIME_TRIGGERS, Route::RealTime),
];

/// Words that mark a query as needing live data.
pub const REAL_TIME_TRIGGERS: &[&str] = &[
    "current",
    "latest",
    "recent",
    "today",
    "now",
    "live",
    "breaking",
    "trending",
    "price",
    "stock",
    "crypto",
    "weather",
    "news",
    "traffic",
    "score",
    "search for",
    "google",
];

const REAL_TIME_RULES: &[(&[&str], RealTimeKind)] = &[
    (&["weather"], RealTimeKind::Weather),
    (&["news"], RealTimeKind::News),
    (&["stock"], RealTimeKind::Stock),
    (&["crypto"], RealTimeKind::Crypto),
    (&["sports"], RealTimeKind::Sports),
    (&["traffic"], RealTimeKind::Traffic),
    (&["trending"], RealTimeKind::Trending),
];

const FORMAT_RULES: &[(&[&str], DocumentFormat)] = &[
    (&["presentation", "ppt", "powerpoint"], DocumentFormat::Ppt),
    (&["excel", "spreadsheet"], DocumentFormat::Excel),
    (&["pdf", "report"], DocumentFormat::Pdf),
    (&["word", "document"], DocumentFormat::Word),
];

const CONTROL_RULES: &[(&[&str], ControlIntent)] = &[
    (&["resume", "continue"], ControlIntent::Resume),
    (&["cancel", "stop"], ControlIntent::Cancel),
];

fn first_match<T: Copy>(rules: &[(&[&str], T)], text: &str) -> Option<T> {
    let lowered = text.to_lowercase();
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, outcome)| *outcome)
}

/// Classifies a command into exactly one category.
pub fn classify(text: &str) -> Category {
    match first_match(CATEGORY_RULES, text) {
        Some(Route::FileCreation) => Category::FileCreation,
        Some(Route::SystemControl) => Category::SystemControl,
        Some(Route::SystemInfo) => Category::SystemInfo,
        Some(Route::RealTime) => Category::RealTime(classify_real_time(text)),
        None => Category::GeneralChat,
    }
}

/// Sub-classifies a real-time query. Total over all inputs.
pub fn classify_real_time(text: &str) -> RealTimeKind {
    first_match(REAL_TIME_RULES, text).unwrap_or(RealTimeKind::GeneralSearch)
}

/// Picks the document format a file-creation command asks for.
pub fn document_format(text: &str) -> DocumentFormat {
    first_match(FORMAT_RULES, text).unwrap_or(DocumentFormat::Word)
}

/// Detects `resume`/`continue` and `cancel`/`stop` commands.
pub fn control_intent(text: &str) -> Option<ControlIntent> {
    first_match(CONTROL_RULES, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        // "create" beats "open", "system" and every real-time trigger.
        assert_eq!(
            classify("create a report on the current system status"),
            Category::FileCreation
        );
        assert_eq!(classify("open the latest news app"), Category::SystemControl);
        assert_eq!(classify("system status today"), Category::SystemInfo);
        assert_eq!(
            classify("what's the weather today"),
            Category::RealTime(RealTimeKind::Weather)
        );
        assert_eq!(classify("tell me a joke"), Category::GeneralChat);
    }

    #[test]
    fn test_weather_always_wins_real_time_subclass() {
        let inputs = [
            "weather",
            "WEATHER in Paris",
            "news about the weather",
            "stock weather crypto",
            "is the weather nice for the traffic",
            "weathervane prices",
        ];
        for input in inputs {
            assert_eq!(classify_real_time(input), RealTimeKind::Weather, "{input}");
            assert_eq!(
                classify(input),
                Category::RealTime(RealTimeKind::Weather),
                "{input}"
            );
        }
    }

    #[test]
    fn test_real_time_sub_classes() {
        assert_eq!(
            classify("latest news on fusion"),
            Category::RealTime(RealTimeKind::News)
        );
        assert_eq!(
            classify("AAPL stock price"),
            Category::RealTime(RealTimeKind::Stock)
        );
        assert_eq!(
            classify("bitcoin crypto price"),
            Category::RealTime(RealTimeKind::Crypto)
        );
        assert_eq!(
            classify("live sports scores"),
            Category::RealTime(RealTimeKind::Sports)
        );
        assert_eq!(
            classify("traffic on the 405"),
            Category::RealTime(RealTimeKind::Traffic)
        );
        assert_eq!(
            classify("what is trending"),
            Category::RealTime(RealTimeKind::Trending)
        );
        assert_eq!(
            classify("search for arc reactor designs"),
            Category::RealTime(RealTimeKind::GeneralSearch)
        );
    }

    #[test]
    fn test_matching_is_substring_based() {
        // "snow" contains "now", which is a real-time trigger.
        assert_eq!(
            classify("will it snow"),
            Category::RealTime(RealTimeKind::GeneralSearch)
        );
    }

    #[test]
    fn test_composite_kind_mapping() {
        assert_eq!(RealTimeKind::Trending.composite_kind(), Some(RealtimeKind::Trends));
        assert_eq!(RealTimeKind::Stock.composite_kind(), Some(RealtimeKind::Stock));
        assert_eq!(RealTimeKind::Weather.composite_kind(), None);
        assert_eq!(RealTimeKind::GeneralSearch.composite_kind(), None);
    }

    #[test]
    fn test_document_format() {
        assert_eq!(document_format("make a PowerPoint on mars"), DocumentFormat::Ppt);
        assert_eq!(document_format("generate a spreadsheet"), DocumentFormat::Excel);
        assert_eq!(document_format("create a report"), DocumentFormat::Pdf);
        assert_eq!(document_format("create a word file"), DocumentFormat::Word);
        assert_eq!(document_format("create something"), DocumentFormat::Word);
    }

    #[test]
    fn test_control_intent() {
        assert_eq!(control_intent("Resume please"), Some(ControlIntent::Resume));
        assert_eq!(control_intent("continue"), Some(ControlIntent::Resume));
        assert_eq!(control_intent("stop that"), Some(ControlIntent::Cancel));
        assert_eq!(control_intent("cancel"), Some(ControlIntent::Cancel));
        assert_eq!(control_intent("hello"), None);
    }
}
