use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LlmClient;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Talks to a local Ollama server through its `/api/generate` endpoint
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 150,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Wall-clock limit for one HTTP round trip
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn query(&self, prompt: String) -> Result<String> {
        // reqwest and the timeout both need the reactor; without one they panic
        tokio::runtime::Handle::try_current().context("OllamaClient needs a Tokio runtime")?;

        let body = self.request_body(&prompt);
        log::debug!("Querying Ollama model {} ({} prompt chars)", self.model, prompt.len());

        let request = async {
            let response = self
                .http
                .post(self.endpoint())
                .json(&body)
                .send()
                .await
                .context("Failed to reach Ollama")?
                .error_for_status()
                .context("Ollama returned an error status")?;
            response
                .json::<GenerateResponse>()
                .await
                .context("Failed to decode Ollama response")
        };

        let generated = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| anyhow::anyhow!("Ollama did not answer within {:?}", self.timeout))??;
        Ok(generated.response)
    }
}
