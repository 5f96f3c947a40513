//! Canopy LLM Provider Layer
//!
//! Pluggable LLM provider implementations behind a single async trait.
//!
//! # Architecture
//!
//! Providers implement [`LlmProvider`]: send a prompt plus a JSON-Schema
//! description of the desired output shape, get text back. Schema adherence
//! is closest-effort only — callers parse responses defensively.
//!
//! The [`LlmClient`] facade owns both configured providers and applies
//! per-call provider selection and one-shot failover; see [`client`].
//!
//! # Providers
//!
//! - `MockProvider`: deterministic mock for testing
//! - `AzureOpenAiProvider`: Azure OpenAI chat completions
//! - `OllamaProvider`: local Ollama API integration

#![warn(missing_docs)]

pub mod azure;
pub mod client;
pub mod ollama;

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use azure::AzureOpenAiProvider;
pub use client::{InvokeOptions, LlmClient, ProviderKind};
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Error after a stream was successfully initiated
    #[error("Stream error: {0}")]
    Stream(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Incremental text fragments from a streaming generation.
///
/// Finite and not restartable. Dropping the stream cancels the underlying
/// call. An `Err` item reports a mid-flight failure; initiation failures
/// never produce a stream at all (see [`LlmProvider::generate_stream`]).
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Trait for LLM provider operations
///
/// `schema` is a JSON-Schema value the provider may use to constrain
/// generation. `model_parameters` is an opaque configuration object passed
/// through to the underlying API.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<String, LlmError>;

    /// Streaming variant: yields text fragments as they arrive.
    ///
    /// Returns `Err` when the stream could not be initiated; errors after
    /// initiation surface as `Err` items on the stream itself.
    async fn generate_stream(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<TextStream, LlmError>;
}

/// Mock LLM provider for deterministic testing
///
/// Returns queued responses in FIFO order, falling back to a default
/// response once the queue is empty. Failures can be injected into the
/// queue to exercise error paths. No network calls are made.
///
/// # Examples
///
/// ```
/// use canopy_llm::{LlmProvider, MockProvider};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::new("{\"summary\": \"hi\"}");
/// let out = provider.generate("prompt", &json!({}), None).await.unwrap();
/// assert_eq!(out, "{\"summary\": \"hi\"}");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    queued: Arc<Mutex<VecDeque<Result<String, String>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create a provider that answers every call with a fixed response
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a response for the next unanswered call
    pub fn push_response(&self, response: impl Into<String>) {
        self.queued
            .lock()
            .unwrap()
            .push_back(Ok(response.into()));
    }

    /// Queue a failure for the next unanswered call
    pub fn push_error(&self, message: impl Into<String>) {
        self.queued
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
    }

    /// Number of generate calls received so far
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _schema: &Value,
        _model_parameters: Option<&Value>,
    ) -> Result<String, LlmError> {
        *self.call_count.lock().unwrap() += 1;

        let next = self.queued.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::Other(message)),
            None => Ok(self.default_response.clone()),
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        schema: &Value,
        model_parameters: Option<&Value>,
    ) -> Result<TextStream, LlmError> {
        let text = self.generate(prompt, schema, model_parameters).await?;
        Ok(Box::pin(futures_util::stream::iter([Ok(text)])))
    }
}

/// Placeholder for a provider whose configuration is absent
///
/// Every call fails with the stored reason, so the facade treats the
/// backend as a failed provider and failover applies normally.
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    /// Create a placeholder that fails every call with `reason`
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for UnavailableProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _schema: &Value,
        _model_parameters: Option<&Value>,
    ) -> Result<String, LlmError> {
        Err(LlmError::Other(self.reason.clone()))
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _schema: &Value,
        _model_parameters: Option<&Value>,
    ) -> Result<TextStream, LlmError> {
        Err(LlmError::Other(self.reason.clone()))
    }
}
