use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Text-generation providers reachable through the OpenAI-compatible API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

/// Credentials for the Google APIs used for live data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub news_search_engine_id: Option<String>,
    pub maps_api_key: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
///
/// Every upstream credential is optional: without an LLM key the service
/// answers with the not-configured message, and without Google or
/// OpenWeatherMap keys the live-data lookups use their free fallbacks.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub google: GoogleConfig,
    pub openweather_api_key: Option<String>,
}

/// Reads an optional variable, treating an empty value as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "gemini" => Provider::Gemini,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of 'openai', 'gemini'", other),
                ));
            }
        };

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            provider,
            openai_api_key: optional_var("OPENAI_API_KEY"),
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            chat_model,
            log_level,
            prompts_path,
            google: GoogleConfig {
                api_key: optional_var("GOOGLE_API_KEY"),
                search_engine_id: optional_var("GOOGLE_SEARCH_ENGINE_ID"),
                news_search_engine_id: optional_var("GOOGLE_NEWS_SEARCH_ENGINE_ID"),
                maps_api_key: optional_var("GOOGLE_MAPS_API_KEY"),
            },
            openweather_api_key: optional_var("OPENWEATHER_API_KEY"),
        })
    }

    /// The key for the selected provider, if one is set.
    pub fn llm_api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "LLM_PROVIDER",
        "OPENAI_API_KEY",
        "GEMINI_API_KEY",
        "CHAT_MODEL",
        "RUST_LOG",
        "PROMPTS_PATH",
        "GOOGLE_API_KEY",
        "GOOGLE_SEARCH_ENGINE_ID",
        "GOOGLE_NEWS_SEARCH_ENGINE_ID",
        "GOOGLE_MAPS_API_KEY",
        "OPENWEATHER_API_KEY",
    ];

    fn clear_env_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults_without_any_keys() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load without keys");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.llm_api_key(), None);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.prompts_path, PathBuf::from("./prompts"));
        assert_eq!(config.google, GoogleConfig::default());
        assert_eq!(config.openweather_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_gemini_provider_uses_gemini_key() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "Gemini");
            env::set_var("OPENAI_API_KEY", "openai-key");
            env::set_var("GEMINI_API_KEY", "gemini-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.llm_api_key(), Some("gemini-key"));
        assert!(config.provider.api_base().contains("generativelanguage"));
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("OPENAI_API_KEY", "custom-openai-key");
            env::set_var("CHAT_MODEL", "gpt-4o");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
            env::set_var("GOOGLE_API_KEY", "g-key");
            env::set_var("GOOGLE_SEARCH_ENGINE_ID", "cx-web");
            env::set_var("GOOGLE_NEWS_SEARCH_ENGINE_ID", "cx-news");
            env::set_var("GOOGLE_MAPS_API_KEY", "maps-key");
            env::set_var("OPENWEATHER_API_KEY", "owm-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.llm_api_key(), Some("custom-openai-key"));
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.prompts_path, PathBuf::from("/custom/prompts"));
        assert_eq!(config.google.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.google.search_engine_id.as_deref(), Some("cx-web"));
        assert_eq!(config.google.news_search_engine_id.as_deref(), Some("cx-news"));
        assert_eq!(config.google.maps_api_key.as_deref(), Some("maps-key"));
        assert_eq!(config.openweather_api_key.as_deref(), Some("owm-key"));
    }

    #[test]
    #[serial]
    fn test_blank_keys_count_as_unset() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "   ");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.llm_api_key(), None);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "claude");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, msg) => {
                assert_eq!(var, "LLM_PROVIDER");
                assert!(msg.contains("claude"));
            }
            _ => panic!("Expected InvalidValue for LLM_PROVIDER"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }
}
