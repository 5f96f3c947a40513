//! Azure OpenAI Provider Implementation
//!
//! Chat-completions client with JSON-Schema enforced responses via the
//! `response_format` field. Authentication uses an API key read from the
//! environment; endpoint, deployment and API version are configurable the
//! same way.

use crate::{LlmError, LlmProvider, TextStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

/// Default deployment when none is configured
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4.1-mini_2025-04-14";

/// Default API version
pub const DEFAULT_API_VERSION: &str = "2024-10-21";

/// Default timeout for LLM requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Azure OpenAI chat-completions provider
pub struct AzureOpenAiProvider {
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One server-sent event payload from a streaming completion
#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl AzureOpenAiProvider {
    /// Create a new Azure OpenAI provider
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap();

        Self {
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: api_version.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Build a provider from `AZURE_OPENAI_*` environment variables.
    ///
    /// `AZURE_OPENAI_ENDPOINT` and `AZURE_OPENAI_API_KEY` are required;
    /// deployment and API version fall back to defaults.
    pub fn from_env() -> Result<Self, LlmError> {
        let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT")
            .map_err(|_| LlmError::Other("AZURE_OPENAI_ENDPOINT env var not set".to_string()))?;
        let api_key = std::env::var("AZURE_OPENAI_API_KEY")
            .map_err(|_| LlmError::Other("AZURE_OPENAI_API_KEY env var not set".to_string()))?;
        let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT")
            .unwrap_or_else(|_| DEFAULT_DEPLOYMENT.to_string());
        let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        Ok(Self::new(endpoint, deployment, api_version, api_key))
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    fn request_body(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
        stream: bool,
    ) -> Value {
        let mut body = json!({
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "jsonOutput",
                    "schema": schema,
                }
            },
            "stream": stream,
        });

        // Opaque passthrough: caller-supplied parameters override ours
        if let (Some(Value::Object(params)), Value::Object(merged)) =
            (model_parameters, &mut body)
        {
            for (key, value) in params {
                merged.insert(key.clone(), value.clone());
            }
        }

        body
    }

    async fn send_completions(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(LlmError::RateLimitExceeded)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(LlmError::ModelNotAvailable(self.deployment.clone()))
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
impl LlmProvider for AzureOpenAiProvider {
    async fn generate(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<String, LlmError> {
        let body = self.request_body(prompt, schema, model_parameters, false);
        let response = self.send_completions(&body).await?;

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<TextStream, LlmError> {
        let body = self.request_body(prompt, schema, model_parameters, true);
        let response = self.send_completions(&body).await?;

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

                // SSE frames: `data: <json>` lines, terminated by `data: [DONE]`
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();

                    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        return;
                    }

                    match serde_json::from_str::<ChatCompletionChunk>(payload) {
                        Ok(parsed) => {
                            let fragment = parsed
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content);
                            if let Some(fragment) = fragment {
                                if !fragment.is_empty() && tx.send(Ok(fragment)).await.is_err() {
                                    // Receiver dropped: caller cancelled the stream
                                    return;
                                }
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
