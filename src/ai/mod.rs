pub mod transport;

use crate::ai::transport::{ChatMessage, ChatRequest, CompletionTransport, HttpTransport};
use crate::config::Config;
use anyhow::{Context, Result};
use tracing::{info, warn};

pub const MISSING_API_KEY_MESSAGE: &str =
    "Error: OpenAI API key is not set. Set OPENAI_API_KEY or run `CodeSnip config set ai.api_key <KEY>`.";
pub const GENERATION_ERROR_PREFIX: &str = "Error generating code:";

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub language: String,
}

impl GeneratorSettings {
    /// Resolves the API key once; later environment changes are not seen.
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.resolve_api_key(),
            base_url: config.ai_api_base_url.clone(),
            model: config.ai_model.clone(),
            max_tokens: config.ai_max_tokens.max(1),
            temperature: config.ai_temperature,
            timeout_seconds: config.ai_timeout_seconds.max(crate::config::MIN_TIMEOUT_SECONDS),
            language: config.language.clone(),
        }
    }
}

pub struct SnippetGenerator<T = HttpTransport> {
    settings: GeneratorSettings,
    transport: T,
}

impl SnippetGenerator<HttpTransport> {
    pub fn from_config(config: &Config) -> Self {
        let settings = GeneratorSettings::from_config(config);
        let transport = HttpTransport::new(&settings.base_url, settings.timeout_seconds);
        Self::new(settings, transport)
    }
}

impl<T: CompletionTransport> SnippetGenerator<T> {
    pub fn new(settings: GeneratorSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Always returns display-ready text. Failures come back as a message
    /// starting with `Error`.
    pub fn generate(&self, task: &str) -> String {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            warn!("snippet generation skipped: API key missing");
            return MISSING_API_KEY_MESSAGE.to_string();
        };

        info!(
            model = %self.settings.model,
            task_chars = task.chars().count(),
            "requesting snippet"
        );

        match self.transport.complete(&self.snippet_request(task), api_key) {
            Ok(content) => content.trim().to_string(),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "snippet generation failed");
                format!("{GENERATION_ERROR_PREFIX} {error:#}")
            }
        }
    }

    /// Live round trip with the configured endpoint. Unlike `generate`,
    /// failures are returned as errors.
    pub fn test_connection(&self) -> Result<String> {
        let api_key = self.settings.api_key.as_deref().context(
            "AI API key is missing. Set `CodeSnip config set ai.api_key <KEY>` or `OPENAI_API_KEY`.",
        )?;

        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system("Reply with one short sentence confirming the API works."),
                ChatMessage::user("Health check for CodeSnip."),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        self.transport.complete(&request, api_key)
    }

    fn snippet_request(&self, task: &str) -> ChatRequest {
        let language = &self.settings.language;

        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(format!(
                    "You are a helpful assistant that generates {language} code snippets."
                )),
                ChatMessage::user(format!(
                    "Write a {language} code for the following task:\n{task}"
                )),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}
