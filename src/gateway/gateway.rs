//! The gateway proper: ordered fallback, bounded backoff, structured-output
//! validation with correction re-prompts, and chunked completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;

use super::chunking::{estimate_tokens, split_prompts, PromptFrame};
use super::provider::{LlmProvider, ProviderError};
use super::ModelError;

/// Gateway tuning knobs.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Retries against the SAME provider on rate-limit or timeout before
    /// advancing the fallback chain.
    pub same_provider_retries: u32,
    /// Correction re-prompts after a malformed structured response.
    pub format_reprompts: u32,
    /// Base backoff delay; doubles per retry, with jitter.
    pub backoff_base_ms: u64,
    /// Backoff ceiling.
    pub backoff_cap_ms: u64,
    /// Tokens reserved in the context window for the model's reply.
    pub reply_reserve_tokens: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            same_provider_retries: 2,
            format_reprompts: 3,
            backoff_base_ms: 250,
            backoff_cap_ms: 5_000,
            reply_reserve_tokens: 1_024,
        }
    }
}

/// LLM access point with ordered provider fallback.
pub struct ModelGateway {
    providers: Vec<Box<dyn LlmProvider>>,
    config: GatewayConfig,
}

impl ModelGateway {
    pub fn new(providers: Vec<Box<dyn LlmProvider>>, config: GatewayConfig) -> Self {
        Self { providers, config }
    }

    /// The context window chunking must respect: the minimum across the
    /// chain, so a fallback provider can always serve a chunk produced for
    /// the primary.
    pub fn min_context_window(&self) -> usize {
        self.providers
            .iter()
            .map(|p| p.context_window())
            .min()
            .unwrap_or(0)
    }

    /// One completion with provider fallback. Rate limits and timeouts are
    /// retried on the same provider with exponential backoff; connection
    /// and API errors advance to the next provider immediately.
    pub fn complete_text(&self, system: &str, prompt: &str) -> Result<String, ModelError> {
        if self.providers.is_empty() {
            return Err(ModelError::NoProviders);
        }

        let mut last_error = String::new();
        for provider in &self.providers {
            let mut attempt: u32 = 0;
            loop {
                match provider.complete(system, prompt) {
                    Ok(text) => return Ok(text),
                    Err(e @ (ProviderError::RateLimited | ProviderError::Timeout { .. }))
                        if attempt < self.config.same_provider_retries =>
                    {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            provider = provider.name(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Provider throttled or slow, backing off"
                        );
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            provider = provider.name(),
                            error = %e,
                            "Provider failed, advancing fallback chain"
                        );
                        last_error = format!("{}: {e}", provider.name());
                        break;
                    }
                }
            }
        }

        Err(ModelError::AllProvidersExhausted { last_error })
    }

    /// Completion parsed into `T`. On a malformed response, re-prompts with
    /// the malformed output quoted and a correction instruction, up to the
    /// configured bound.
    pub fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, ModelError> {
        let max_attempts = self.config.format_reprompts + 1;
        let mut current_prompt = prompt.to_string();
        let mut last_detail = String::new();

        for attempt in 1..=max_attempts {
            let response = self.complete_text(system, &current_prompt)?;
            let payload = extract_json_payload(&response);
            match serde_json::from_str::<T>(payload) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        "Structured response unparsable"
                    );
                    last_detail = e.to_string();
                    current_prompt = correction_prompt(prompt, &response, &e.to_string());
                }
            }
        }

        Err(ModelError::ResponseFormat {
            attempts: max_attempts,
            detail: last_detail,
        })
    }

    /// Chunked completion: splits the frame against the minimum context
    /// window, completes each chunk sequentially, and merges the typed
    /// partials with the caller's policy. Sections stay in frame order, so
    /// the merge input order is deterministic. The cancellation flag is
    /// observed before every chunk dispatch; completions already in flight
    /// finish, the rest are never sent.
    pub fn complete_chunked<T, F>(
        &self,
        system: &str,
        frame: &PromptFrame,
        cancel: &AtomicBool,
        merge: F,
    ) -> Result<T, ModelError>
    where
        T: DeserializeOwned,
        F: Fn(Vec<T>) -> T,
    {
        let budget = self.prompt_budget(system);
        let prompts = split_prompts(frame, budget);

        let mut parts = Vec::with_capacity(prompts.len());
        for (i, prompt) in prompts.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!(
                    chunk = i + 1,
                    chunks = prompts.len(),
                    "Cancelled before dispatching remaining chunks"
                );
                return Err(ModelError::Cancelled);
            }
            tracing::debug!(chunk = i + 1, chunks = prompts.len(), "Dispatching prompt chunk");
            parts.push(self.complete_json::<T>(system, prompt)?);
        }
        Ok(merge(parts))
    }

    fn prompt_budget(&self, system: &str) -> usize {
        let window = self.min_context_window();
        window
            .saturating_sub(self.config.reply_reserve_tokens)
            .saturating_sub(estimate_tokens(system))
            .max(1)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.min(10))
            .min(self.config.backoff_cap_ms);
        let jitter = if self.config.backoff_base_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.backoff_base_ms / 2)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

/// Pull the JSON payload out of an LLM reply: a fenced ```json block if
/// present, otherwise the outermost object or array span, otherwise the
/// trimmed text.
fn extract_json_payload(response: &str) -> &str {
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + 7;
        if let Some(fence_len) = response[content_start..].find("```") {
            return response[content_start..content_start + fence_len].trim();
        }
    }
    let span = match (response.find('{'), response.find('[')) {
        (Some(obj), Some(arr)) if arr < obj => response.rfind(']').map(|close| (arr, close)),
        (Some(obj), _) => response.rfind('}').map(|close| (obj, close)),
        (None, Some(arr)) => response.rfind(']').map(|close| (arr, close)),
        (None, None) => None,
    };
    if let Some((open, close)) = span {
        if open < close {
            return response[open..=close].trim();
        }
    }
    response.trim()
}

fn correction_prompt(original: &str, malformed: &str, error: &str) -> String {
    format!(
        "{original}\n\nYour previous reply could not be parsed as the required JSON \
         ({error}). The reply was:\n\n{malformed}\n\n\
         Reply again with ONLY valid JSON matching the required schema. \
         No prose, no markdown outside a ```json fence."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::provider::{MockFailure, MockProvider};
    use crate::gateway::PromptSection;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        value: u32,
    }

    /// Config with no sleeps so retry tests run instantly.
    fn fast_config() -> GatewayConfig {
        GatewayConfig {
            backoff_base_ms: 0,
            backoff_cap_ms: 0,
            ..Default::default()
        }
    }

    fn gateway(providers: Vec<Box<dyn LlmProvider>>) -> ModelGateway {
        ModelGateway::new(providers, fast_config())
    }

    #[test]
    fn empty_chain_reports_no_providers() {
        let gw = gateway(vec![]);
        assert!(matches!(
            gw.complete_text("s", "p"),
            Err(ModelError::NoProviders)
        ));
    }

    // Scenario B: primary always errors, fallback succeeds → caller
    // observes no error.
    #[test]
    fn scenario_b_fallback_serves_when_primary_errors() {
        let gw = gateway(vec![
            Box::new(MockProvider::always_failing("primary", MockFailure::Api)),
            Box::new(MockProvider::always("fallback", r#"{"value": 7}"#)),
        ]);
        let result: Echo = gw.complete_json("s", "p").unwrap();
        assert_eq!(result, Echo { value: 7 });
    }

    #[test]
    fn all_providers_failing_surfaces_hard_error() {
        let gw = gateway(vec![
            Box::new(MockProvider::always_failing("a", MockFailure::Connection)),
            Box::new(MockProvider::always_failing("b", MockFailure::Api)),
        ]);
        let err = gw.complete_text("s", "p").unwrap_err();
        match err {
            ModelError::AllProvidersExhausted { last_error } => {
                assert!(last_error.contains("b"), "last error names final provider");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn rate_limit_retries_same_provider_before_fallover() {
        let primary = MockProvider::new(
            "primary",
            vec![
                Err(MockFailure::RateLimited),
                Err(MockFailure::RateLimited),
                Ok("ok".into()),
            ],
        );
        let gw = ModelGateway::new(vec![Box::new(primary)], fast_config());
        assert_eq!(gw.complete_text("s", "p").unwrap(), "ok");
    }

    #[test]
    fn timeout_retries_then_advances_chain() {
        // Primary times out more often than the retry bound allows; the
        // fallback must serve.
        let primary = MockProvider::always_failing("primary", MockFailure::Timeout);
        let fallback = MockProvider::always("fallback", "served");
        let gw = gateway(vec![Box::new(primary), Box::new(fallback)]);
        assert_eq!(gw.complete_text("s", "p").unwrap(), "served");
    }

    #[test]
    fn generic_error_advances_without_same_provider_retry() {
        let primary = std::sync::Arc::new(MockProvider::always_failing(
            "primary",
            MockFailure::Api,
        ));
        let fallback = MockProvider::always("fallback", "served");

        struct Shared(std::sync::Arc<MockProvider>);
        impl LlmProvider for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn context_window(&self) -> usize {
                self.0.context_window()
            }
            fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
                self.0.complete(system, prompt)
            }
        }

        let gw = ModelGateway::new(
            vec![Box::new(Shared(primary.clone())), Box::new(fallback)],
            fast_config(),
        );
        assert_eq!(gw.complete_text("s", "p").unwrap(), "served");
        // API errors fall over immediately: exactly one call to the primary.
        assert_eq!(primary.call_count(), 1);
    }

    // Scenario C: malformed twice then valid within the retry bound →
    // success. Four consecutive malformed with bound 3 → ResponseFormat.
    #[test]
    fn scenario_c_reprompt_recovers_within_bound() {
        let provider = MockProvider::new(
            "p",
            vec![
                Ok("not json".into()),
                Ok("still not json".into()),
                Ok(r#"{"value": 3}"#.into()),
            ],
        );
        let gw = ModelGateway::new(vec![Box::new(provider)], fast_config());
        let result: Echo = gw.complete_json("s", "p").unwrap();
        assert_eq!(result.value, 3);
    }

    #[test]
    fn scenario_c_bound_exhausted_surfaces_format_error() {
        let provider = MockProvider::always("p", "never valid json");
        let gw = ModelGateway::new(vec![Box::new(provider)], fast_config());
        let err = gw.complete_json::<Echo>("s", "p").unwrap_err();
        match err {
            ModelError::ResponseFormat { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn chunked_completion_merges_in_section_order() {
        #[derive(Debug, Deserialize)]
        struct Part {
            value: u32,
        }

        // Tiny window forces one chunk per section; the scripted provider
        // answers each chunk with an increasing value.
        let provider = MockProvider::new(
            "p",
            vec![
                Ok(r#"{"value": 1}"#.into()),
                Ok(r#"{"value": 2}"#.into()),
                Ok(r#"{"value": 3}"#.into()),
            ],
        )
        .with_context_window(1_200);

        let mut config = fast_config();
        config.reply_reserve_tokens = 1_000;
        let gw = ModelGateway::new(vec![Box::new(provider)], config);

        let frame = PromptFrame {
            header: "H".into(),
            sections: (1..=3)
                .map(|i| PromptSection {
                    label: format!("Slide {i}"),
                    text: "x".repeat(400),
                })
                .collect(),
            footer: "F".into(),
        };

        let merged = gw
            .complete_chunked("s", &frame, &AtomicBool::new(false), |parts: Vec<Part>| Part {
                // Concatenate digits so the assertion proves arrival order.
                value: parts.iter().fold(0, |acc, p| acc * 10 + p.value),
            })
            .unwrap();
        // 1 then 2 then 3 → deterministic order regardless of timing.
        assert_eq!(merged.value, 123);
    }

    // A cancel raised while one chunk is in flight must stop the remaining
    // chunk dispatches, not just the next call into the gateway.
    #[test]
    fn chunked_completion_stops_at_cancel_between_chunks() {
        use std::sync::Arc;

        /// Answers each call, then raises the shared cancel flag.
        struct CancelAfterFirst {
            cancel: Arc<AtomicBool>,
            calls: std::sync::atomic::AtomicUsize,
        }
        impl LlmProvider for CancelAfterFirst {
            fn name(&self) -> &str {
                "cancelling"
            }
            fn context_window(&self) -> usize {
                1_200
            }
            fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
                self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.cancel.store(true, Ordering::SeqCst);
                Ok(r#"{"value": 1}"#.into())
            }
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let provider = Arc::new(CancelAfterFirst {
            cancel: cancel.clone(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });

        struct Shared(Arc<CancelAfterFirst>);
        impl LlmProvider for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn context_window(&self) -> usize {
                self.0.context_window()
            }
            fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
                self.0.complete(system, prompt)
            }
        }

        let mut config = fast_config();
        config.reply_reserve_tokens = 1_000;
        let gw = ModelGateway::new(vec![Box::new(Shared(provider.clone()))], config);

        // Window 1,200 with reserve 1,000 forces one section per chunk.
        let frame = PromptFrame {
            header: "H".into(),
            sections: (1..=3)
                .map(|i| PromptSection {
                    label: format!("Slide {i}"),
                    text: "x".repeat(400),
                })
                .collect(),
            footer: "F".into(),
        };

        let err = gw
            .complete_chunked("s", &frame, &cancel, |parts: Vec<Echo>| {
                parts.into_iter().next().unwrap()
            })
            .unwrap_err();
        assert!(matches!(err, ModelError::Cancelled));
        // Only the in-flight first chunk was completed.
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn extract_payload_prefers_fenced_block() {
        let r = "Sure!\n```json\n{\"value\": 1}\n```\nDone.";
        assert_eq!(extract_json_payload(r), "{\"value\": 1}");
    }

    #[test]
    fn extract_payload_falls_back_to_brace_span() {
        let r = "Here you go: {\"value\": 2} hope that helps";
        assert_eq!(extract_json_payload(r), "{\"value\": 2}");
    }

    #[test]
    fn extract_payload_keeps_top_level_arrays_intact() {
        let r = "Result: [{\"value\": 3}] as requested";
        assert_eq!(extract_json_payload(r), "[{\"value\": 3}]");
    }

    #[test]
    fn extract_payload_returns_trimmed_text_when_no_json() {
        assert_eq!(extract_json_payload("  plain  "), "plain");
    }

    #[test]
    fn min_context_window_takes_smallest() {
        let gw = gateway(vec![
            Box::new(MockProvider::always("a", "x").with_context_window(32_000)),
            Box::new(MockProvider::always("b", "x").with_context_window(8_000)),
        ]);
        assert_eq!(gw.min_context_window(), 8_000);
    }

    #[test]
    fn correction_prompt_quotes_malformed_output() {
        let p = correction_prompt("original", "garbage reply", "expected value");
        assert!(p.contains("original"));
        assert!(p.contains("garbage reply"));
        assert!(p.contains("expected value"));
    }
}
