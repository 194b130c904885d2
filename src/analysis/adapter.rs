/*!
 * Bounded-retry wrapper around the analyzer.
 *
 * The adapter owns the only path to the provider. Each call to `analyze`
 * works on a caller-supplied response slot: a cached raw response is reused
 * without calling the provider, and the slot is cleared whenever extraction
 * fails so the next attempt asks again.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};

use crate::errors::AnalysisError;
use crate::providers::Provider;

use super::extractor::extract_structured;
use super::prompt::build_instruction;
use super::reconstruct::{annotate_text, Reconstruction};
use super::AnalysisResult;

/// Retries after the first attempt; four attempts in total
pub const MAX_RETRIES: u32 = 3;

/// Runs the analyzer for one cue at a time
#[derive(Debug, Clone)]
pub struct AnalyzerAdapter {
    provider: Arc<dyn Provider>,
    timeout: Duration,
    retry_backoff: Duration,
}

impl AnalyzerAdapter {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            retry_backoff: Duration::ZERO,
        }
    }

    /// Pause before retry `n` for `backoff * 2^(n-1)`
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Analyze `source_text`, reusing the raw response held in `cached`.
    ///
    /// On success `cached` holds the response the result came from. After
    /// `MAX_RETRIES + 1` failed attempts the last failure is returned inside
    /// `AnalysisError::AnalysisExhausted` and `cached` is empty.
    pub async fn analyze(
        &self,
        source_text: &str,
        cached: &mut Option<String>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let instruction = build_instruction(source_text);
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&instruction, cached).await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Analysis succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    *cached = None;

                    if attempt >= MAX_RETRIES {
                        error!(
                            "Analysis failed after {} attempts with {}: {}",
                            attempt + 1,
                            self.provider.name(),
                            e
                        );
                        return Err(AnalysisError::AnalysisExhausted {
                            attempts: attempt + 1,
                            last: Box::new(e),
                        });
                    }

                    warn!(
                        "Analysis attempt {}/{} failed: {}",
                        attempt + 1,
                        MAX_RETRIES + 1,
                        e
                    );
                    attempt += 1;

                    if !self.retry_backoff.is_zero() {
                        tokio::time::sleep(self.retry_backoff * (1u32 << (attempt - 1))).await;
                    }
                }
            }
        }
    }

    /// Analyze and align in one step
    pub async fn annotate(
        &self,
        source_text: &str,
        cached: &mut Option<String>,
    ) -> Result<Reconstruction, AnalysisError> {
        let result = self.analyze(source_text, cached).await?;
        Ok(annotate_text(source_text, &result))
    }

    async fn attempt(
        &self,
        instruction: &str,
        cached: &mut Option<String>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let raw = match cached.take() {
            Some(raw) => raw,
            None => self.invoke(instruction).await?,
        };

        let parsed = extract_structured(&raw).and_then(AnalysisResult::from_structured);
        *cached = Some(raw);
        parsed
    }

    async fn invoke(&self, instruction: &str) -> Result<String, AnalysisError> {
        match tokio::time::timeout(self.timeout, self.provider.complete(instruction)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(AnalysisError::AnalyzerUnavailable(e)),
            Err(_) => Err(AnalysisError::AnalyzerTimeout(self.timeout)),
        }
    }
}
