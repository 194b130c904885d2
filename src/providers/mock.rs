/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::scripted(..)` - Replies from a list, repeating the last one
 * - `MockProvider::keyed(..)` - Picks the reply by the cue text in the prompt
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::slow(..)` - Replies after a delay, for timeout tests
 *
 * Clones share the request counter and the prompt log.
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::analysis::sentence_of;
use crate::errors::ProviderError;
use crate::providers::Provider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Answers from the scripted replies
    Working,
    /// Always fails with an error
    Failing,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing analysis behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Replies handed out in order; the last one repeats
    replies: Arc<Vec<String>>,
    /// Replies chosen by cue text, checked before `replies`
    keyed: Arc<Vec<(String, String)>>,
    /// Number of calls made so far
    request_count: Arc<AtomicUsize>,
    /// Every prompt received
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior, replies: Vec<String>) -> Self {
        Self {
            behavior,
            replies: Arc::new(replies),
            keyed: Arc::new(Vec::new()),
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock that always answers with `reply`
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::new(MockBehavior::Working, vec![reply.into()])
    }

    /// Mock that answers with each reply in turn
    pub fn scripted<S: Into<String>>(replies: Vec<S>) -> Self {
        Self::new(
            MockBehavior::Working,
            replies.into_iter().map(Into::into).collect(),
        )
    }

    /// Mock that answers with the reply whose cue text matches the prompt exactly,
    /// falling back to `default`
    pub fn keyed<S: Into<String>>(pairs: Vec<(S, String)>, default: impl Into<String>) -> Self {
        let mut provider = Self::new(MockBehavior::Working, vec![default.into()]);
        provider.keyed = Arc::new(
            pairs
                .into_iter()
                .map(|(text, reply)| (text.into(), reply))
                .collect(),
        );
        provider
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, Vec::new())
    }

    /// Mock that waits before answering with `reply`
    pub fn slow(delay: Duration, reply: impl Into<String>) -> Self {
        Self::new(
            MockBehavior::Slow {
                delay_ms: delay.as_millis() as u64,
            },
            vec![reply.into()],
        )
    }

    /// Number of calls received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// A well-formed analyzer answer for the given words
    ///
    /// Each `(surface, reading)` pair becomes one token; an empty reading
    /// yields `null` markup.
    pub fn analysis_reply(input: &str, words: &[(&str, &str)]) -> String {
        let tokens: Vec<&str> = words.iter().map(|(surface, _)| *surface).collect();
        let entries: Vec<serde_json::Value> = words
            .iter()
            .map(|(surface, reading)| {
                let ruby = if reading.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(format!("<ruby>{}<rt>{}</rt></ruby>", surface, reading))
                };
                serde_json::json!({ "orthography": surface, "ruby_html": ruby })
            })
            .collect();

        let body = serde_json::json!({
            "input": input,
            "wakachigaki": tokens,
            "words": entries,
        });

        format!(
            "Here is the analysis:\n```json\n{}\n```\n",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        )
    }

    fn reply_for(&self, prompt: &str, count: usize) -> String {
        let sentence = sentence_of(prompt);
        if let Some((_, reply)) = self.keyed.iter().find(|(text, _)| Some(text.as_str()) == sentence) {
            return reply.clone();
        }

        match self.replies.len() {
            0 => String::new(),
            len => self.replies[count.min(len - 1)].clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.reply_for(prompt, count)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: format!("Simulated provider failure (request #{})", count + 1),
                status_code: 500,
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.reply_for(prompt, count))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
