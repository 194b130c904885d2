use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{status_error, transport_error, Provider};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model used for generation
    model: String,
    /// Sampling temperature
    temperature: f32,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: None,
            keep_alive: None,
        }
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Set how long the model stays loaded
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Ask for a single response object instead of a stream
    pub fn no_stream(mut self) -> Self {
        self.stream = Some(false);
        self
    }
}

impl GenerationResponse {
    /// Parse a response body, accepting streamed JSON lines as well as a single object
    pub fn from_body(body: &str) -> Result<Self, ProviderError> {
        if let Ok(response) = serde_json::from_str::<GenerationResponse>(body) {
            return Ok(response);
        }

        // A streamed body: one object per line, text split across them
        let mut pieces = Vec::new();
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let piece = serde_json::from_str::<GenerationResponse>(line).map_err(|e| {
                let preview: String = body.chars().take(500).collect();
                error!("Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}", e, preview);
                ProviderError::ParseError(format!("ollama: {}", e))
            })?;
            pieces.push(piece);
        }

        let last = pieces
            .last()
            .ok_or_else(|| ProviderError::ParseError("ollama: empty response body".to_string()))?;

        Ok(GenerationResponse {
            model: last.model.clone(),
            response: pieces.iter().map(|p| p.response.as_str()).collect(),
            done: pieces.iter().any(|p| p.done),
            prompt_eval_count: last.prompt_eval_count,
            eval_count: last.eval_count,
        })
    }
}

impl Ollama {
    /// Create a new client for `base_url` (`scheme://host:port`)
    ///
    /// Ollama speaks HTTP/1.1; connections are kept alive for parallel cues.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(timeout)
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            model: model.into(),
            temperature,
        }
    }

    /// Generate text from the Ollama API
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self.client.post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("ollama", e))?;

        if !response.status().is_success() {
            return Err(status_error("ollama", response).await);
        }

        let body = response.text().await
            .map_err(|e| ProviderError::ParseError(format!("ollama: failed to read response: {}", e)))?;

        let parsed = GenerationResponse::from_body(&body)?;
        debug!(
            "Ollama {} finished (prompt tokens: {:?}, generated: {:?})",
            parsed.model, parsed.prompt_eval_count, parsed.eval_count
        );
        Ok(parsed)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url)
            .send()
            .await
            .map_err(|e| transport_error("ollama", e))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("ollama version: {}", e)))?;

        response["version"].as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(&self.model, prompt)
            .temperature(self.temperature)
            .no_stream();

        Ok(self.generate(&request).await?.response)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
