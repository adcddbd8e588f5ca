//! Language model client: prompt in, generated text out.
//!
//! [`RemoteGenerator`] calls a chat-completions style API and returns the
//! first choice's message content verbatim. Retries follow the same
//! discipline as the embedding client: 429/5xx and transport errors back
//! off and retry, other client errors fail immediately.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GenerationConfig;

/// Environment variable holding the generation API key.
pub const API_KEY_ENV: &str = "GENERATION_API_KEY";

/// Trait for text-generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Invoke the model with the assembled prompt and return its text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// Generation provider calling a remote chat-completions API.
pub struct RemoteGenerator {
    url: String,
    model: String,
    temperature: f32,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl RemoteGenerator {
    /// Create a remote generator from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `GENERATION_API_KEY` is not in the environment
    /// or the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", API_KEY_ENV))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for RemoteGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatResponse = response.json().await?;
                        let answer = parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|choice| choice.message.content)
                            .ok_or_else(|| {
                                anyhow::anyhow!("Generation response contained no choices")
                            })?;
                        return Ok(answer);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Generation API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Generation API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}
