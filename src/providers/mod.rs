/*!
 * Analyzer back-ends.
 *
 * This module contains client implementations for the LLM services that can
 * act as the text analyzer:
 * - OpenAI: chat completions, also used for LM Studio and other compatible servers
 * - Ollama: local LLM server
 * - Anthropic: messages API
 * - Mock: scripted responses for tests
 *
 * Clients make exactly one request per call. Retrying is the analysis
 * adapter's job.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::error;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::app_config::{AnalyzerConfig, AnalyzerProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

use self::anthropic::Anthropic;
use self::ollama::Ollama;
use self::openai::OpenAI;

/// Common trait for all analyzer providers
///
/// Implementations take a complete instruction and return the model's raw
/// text, allowing them to be used interchangeably behind `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send `prompt` and return the raw completion text
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &AnalyzerConfig) -> Result<Arc<dyn Provider>> {
    config.validate()?;

    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let temperature = config.common.temperature;
    let timeout = Duration::from_secs(config.get_timeout_secs());

    let provider: Arc<dyn Provider> = match config.provider {
        AnalyzerProvider::OpenAI => Arc::new(OpenAI::new(
            config.get_api_key(),
            endpoint,
            model,
            temperature,
            timeout,
        )),
        AnalyzerProvider::LMStudio => {
            // LM Studio accepts any key
            let api_key = {
                let k = config.get_api_key();
                if k.is_empty() { "lm-studio".to_string() } else { k }
            };
            Arc::new(
                OpenAI::new(api_key, endpoint, model, temperature, timeout).with_name("lmstudio"),
            )
        }
        AnalyzerProvider::Ollama => {
            let base_url = normalize_base_url(&endpoint)?;
            Arc::new(Ollama::new(base_url, model, temperature, timeout))
        }
        AnalyzerProvider::Anthropic => Arc::new(Anthropic::new(
            config.get_api_key(),
            endpoint,
            model,
            temperature,
            timeout,
        )),
    };

    Ok(provider)
}

/// Reduce an endpoint to `scheme://host:port`, defaulting the port by scheme
pub fn normalize_base_url(endpoint: &str) -> Result<String> {
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", endpoint, e))?;

    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?;
    let port = url
        .port()
        .unwrap_or(if url.scheme() == "https" { 443 } else { 80 });

    Ok(format!("{}://{}:{}", url.scheme(), host, port))
}

/// Map a transport failure to a provider error
pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", provider, e))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, e))
    }
}

/// Turn a non-success HTTP response into a provider error
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", provider, status, message);

    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        code => ProviderError::ApiError {
            status_code: code,
            message,
        },
    }
}
