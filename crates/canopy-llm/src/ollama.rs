//! Ollama Provider Implementation
//!
//! Integration with Ollama's local chat API. Supports running local models
//! for privacy and cost savings, with schema-constrained output via the
//! `format` field.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama chat API
//! - Configurable endpoint and model
//! - JSON-Schema constrained generation
//! - Streaming via newline-delimited JSON chunks

use crate::{LlmError, LlmProvider, TextStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default model when none is configured
pub const DEFAULT_MODEL: &str = "gemma3:1b";

/// Default timeout for LLM requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Request body for the Ollama chat API
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage<'a>>,
    format: &'a Value,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a Value>,
}

/// One response object from the chat API; streaming emits a sequence of
/// these, one per line, with `done` set on the last.
#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: OllamaResponseMessage,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize, Default)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://127.0.0.1:11434")
    /// - `model`: Model to use (e.g., "gemma3:1b", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap();

        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
        }
    }

    /// Create a provider against the default local endpoint
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }

    async fn send_chat(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaChatMessage {
                role: "user",
                content: prompt,
            }],
            format: schema,
            stream,
            options: model_parameters,
        };

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(LlmError::ModelNotAvailable(self.model.clone()))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )))
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<String, LlmError> {
        let response = self
            .send_chat(prompt, schema, model_parameters, false)
            .await?;

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.message.content)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<TextStream, LlmError> {
        let response = self
            .send_chat(prompt, schema, model_parameters, true)
            .await?;

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, LlmError>>(16);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::Stream(e.to_string()))).await;
                        return;
                    }
                };

                buf.extend_from_slice(&chunk);

                // Chat chunks arrive as one JSON object per line
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<OllamaChatResponse>(line) {
                        Ok(parsed) => {
                            if !parsed.message.content.is_empty()
                                && tx.send(Ok(parsed.message.content)).await.is_err()
                            {
                                // Receiver dropped: caller cancelled the stream
                                return;
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx
                                .send(Err(LlmError::Stream(format!(
                                    "Malformed stream chunk: {}",
                                    e
                                ))))
                                .await;
                            return;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
