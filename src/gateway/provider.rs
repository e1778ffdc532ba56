//! LLM provider abstraction and the OpenAI-compatible HTTP implementation.
//!
//! The gateway decides retry and fallback from the `ProviderError` variant:
//! `RateLimited` and `Timeout` are retried against the same provider with
//! backoff; `Connection`, `Api` and `ResponseDecode` advance the fallback
//! chain immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling temperature for all completions. Compliance review is an
/// accuracy-first task.
const TEMPERATURE: f32 = 0.1;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Cannot reach provider: {0}")]
    Connection(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("Provider returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Cannot decode provider response: {0}")]
    ResponseDecode(String),
}

/// One LLM backend in the fallback chain.
pub trait LlmProvider: Send + Sync {
    /// Stable name for logging and failure reports.
    fn name(&self) -> &str;

    /// Context window in tokens. Chunking keys off the minimum window across
    /// the chain so any fallback can serve the same chunk.
    fn context_window(&self) -> usize;

    /// One completion call. Blocking; the per-call timeout lives in the
    /// implementation.
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Configuration for one OpenAI-compatible HTTP provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Base URL, e.g. `https://api.example.com/v1` or a local gateway.
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_context_window() -> usize {
    16_384
}

fn default_timeout_secs() -> u64 {
    120
}

/// OpenAI-compatible chat-completions client.
pub struct HttpProvider {
    config: ProviderConfig,
    client: reqwest::blocking::Client,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn context_window(&self) -> usize {
        self.config.context_window
    }

    fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    seconds: self.config.timeout_secs,
                }
            } else if e.is_connect() {
                ProviderError::Connection(self.config.base_url.clone())
            } else {
                ProviderError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| ProviderError::ResponseDecode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::ResponseDecode("response has no choices".into()))
    }
}

/// Scripted provider for tests: pops one result per call, repeating the
/// last entry once the script is exhausted. Public so downstream pipeline
/// tests can stub the gateway.
pub struct MockProvider {
    name: String,
    context_window: usize,
    script: Mutex<Vec<Result<String, MockFailure>>>,
    calls: AtomicUsize,
}

/// Cloneable stand-in for a `ProviderError` in mock scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Connection,
    Timeout,
    RateLimited,
    Api,
}

impl MockProvider {
    pub fn new(name: &str, script: Vec<Result<String, MockFailure>>) -> Self {
        Self {
            name: name.to_string(),
            context_window: 16_384,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider that always returns the same text.
    pub fn always(name: &str, response: &str) -> Self {
        Self::new(name, vec![Ok(response.to_string())])
    }

    /// Provider that always fails the same way.
    pub fn always_failing(name: &str, failure: MockFailure) -> Self {
        Self::new(name, vec![Err(failure)])
    }

    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens;
        self
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn context_window(&self) -> usize {
        self.context_window
    }

    fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().expect("mock script lock");
        let entry = script
            .get(call)
            .or_else(|| script.last())
            .cloned()
            .unwrap_or_else(|| Err(MockFailure::Api));
        entry.map_err(|f| match f {
            MockFailure::Connection => ProviderError::Connection("mock".into()),
            MockFailure::Timeout => ProviderError::Timeout { seconds: 0 },
            MockFailure::RateLimited => ProviderError::RateLimited,
            MockFailure::Api => ProviderError::Api {
                status: 500,
                body: "mock".into(),
            },
        })
    }
}
