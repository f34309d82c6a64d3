use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Sends one chat completion and returns the text of the first choice.
pub trait CompletionTransport: Send + Sync {
    fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String>;
}

impl<T: CompletionTransport + ?Sized> CompletionTransport for Box<T> {
    fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String> {
        (**self).complete(request, api_key)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    timeout_seconds: u64,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl CompletionTransport for HttpTransport {
    // reqwest's blocking client panics when driven from inside a tokio
    // runtime, so the request runs on its own thread.
    fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String> {
        let endpoint = self.endpoint();
        let timeout_seconds = self.timeout_seconds;
        let api_key = api_key.to_string();
        let request = request.clone();

        std::thread::spawn(move || {
            complete_blocking(&endpoint, timeout_seconds, &api_key, &request)
        })
        .join()
        .map_err(|_| anyhow!("AI worker thread panicked"))?
    }
}

fn complete_blocking(
    endpoint: &str,
    timeout_seconds: u64,
    api_key: &str,
    request: &ChatRequest,
) -> Result<String> {
    if api_key.trim().is_empty() {
        bail!("AI API key is empty");
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("Failed to build Authorization header")?,
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .build()
        .context("Failed to create AI HTTP client")?;

    let response = client
        .post(endpoint)
        .json(request)
        .send()
        .context("AI API request failed")?;

    let status = response.status();
    let body = response.text().context("Failed to read AI response body")?;

    if !status.is_success() {
        bail!("AI API error {}: {}", status, body.trim());
    }

    parse_completion(&body)
}

pub fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .with_context(|| format!("Failed to parse AI response: {body}"))?;

    parsed
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| anyhow!("AI response did not include message.content"))
}
