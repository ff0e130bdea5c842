//! Server configuration from the environment.

use secrecy::SecretString;

use genpaper_common::{GenPaperError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAiCompatible,
    Anthropic,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub llm: LlmConfig,
    pub default_style: String,
    pub generation_timeout_secs: u64,
    pub style_repository_url: Option<String>,
}

impl ServerConfig {
    /// Read configuration from the environment. `.env` files are loaded by
    /// the binary before this runs.
    pub fn from_env() -> Result<Self> {
        let provider = match std::env::var("GENPAPER_LLM_PROVIDER")
            .unwrap_or_else(|_| "openai-compatible".to_string())
            .as_str()
        {
            "openai-compatible" | "openai" | "ollama" => LlmProvider::OpenAiCompatible,
            "anthropic" => LlmProvider::Anthropic,
            other => {
                return Err(GenPaperError::Config(format!(
                    "unknown LLM provider: {other}"
                )))
            }
        };

        let api_key = std::env::var("GENPAPER_LLM_API_KEY")
            .ok()
            .map(SecretString::from);
        if provider == LlmProvider::Anthropic && api_key.is_none() {
            return Err(GenPaperError::Config(
                "GENPAPER_LLM_API_KEY is required for the anthropic provider".to_string(),
            ));
        }

        Ok(Self {
            bind_addr: std::env::var("GENPAPER_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            llm: LlmConfig {
                provider,
                base_url: std::env::var("GENPAPER_LLM_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: std::env::var("GENPAPER_LLM_MODEL")
                    .unwrap_or_else(|_| "llama3:8b".to_string()),
                api_key,
            },
            default_style: std::env::var("GENPAPER_DEFAULT_STYLE")
                .unwrap_or_else(|_| "apa".to_string()),
            generation_timeout_secs: std::env::var("GENPAPER_GENERATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            style_repository_url: std::env::var("GENPAPER_STYLE_REPOSITORY_URL").ok(),
        })
    }
}
