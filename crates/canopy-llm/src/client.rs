//! Unified LLM client with provider selection and one-shot failover
//!
//! The facade owns both configured providers and routes each call to the
//! default or per-call override. With failover enabled, a failed or empty
//! response triggers exactly one attempt on the other provider — no
//! backoff, no cascade. Streaming applies the same selection logic to
//! stream initiation only; once fragments flow there is no mid-stream
//! failover.

use crate::{LlmError, LlmProvider, TextStream};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The configured provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Azure OpenAI chat completions
    Azure,
    /// Local Ollama instance
    Ollama,
}

impl ProviderKind {
    /// The other configured provider, used for failover
    pub fn other(self) -> Self {
        match self {
            ProviderKind::Azure => ProviderKind::Ollama,
            ProviderKind::Ollama => ProviderKind::Azure,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Azure => write!(f, "azure"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(ProviderKind::Azure),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Per-call invocation options
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Override the client's default provider for this call
    pub provider: Option<ProviderKind>,

    /// Opaque configuration forwarded to the underlying API
    pub model_parameters: Option<Value>,

    /// Attempt the other provider once on failure or empty result
    pub failover: bool,
}

impl InvokeOptions {
    /// Options with failover enabled and everything else defaulted
    pub fn with_failover() -> Self {
        Self {
            failover: true,
            ..Self::default()
        }
    }
}

/// Unified LLM client selector
///
/// Construct with both providers; tests inject [`crate::MockProvider`]s.
pub struct LlmClient {
    azure: Arc<dyn LlmProvider>,
    ollama: Arc<dyn LlmProvider>,
    default_provider: ProviderKind,
}

impl LlmClient {
    /// Create a client over the two configured providers
    pub fn new(
        azure: Arc<dyn LlmProvider>,
        ollama: Arc<dyn LlmProvider>,
        default_provider: ProviderKind,
    ) -> Self {
        Self {
            azure,
            ollama,
            default_provider,
        }
    }

    fn provider_for(&self, kind: ProviderKind) -> &dyn LlmProvider {
        match kind {
            ProviderKind::Azure => self.azure.as_ref(),
            ProviderKind::Ollama => self.ollama.as_ref(),
        }
    }

    /// Send a prompt and output schema to the selected provider.
    ///
    /// With `failover`, a thrown error or an empty result triggers one call
    /// to the other provider, whose outcome is returned as-is. Without it,
    /// the first failure propagates.
    pub async fn invoke(
        &self,
        prompt: &str,
        schema: &Value,
        options: &InvokeOptions,
    ) -> Result<String, LlmError> {
        let selected = options.provider.unwrap_or(self.default_provider);
        let params = options.model_parameters.as_ref();

        match self
            .provider_for(selected)
            .generate(prompt, schema, params)
            .await
        {
            Ok(result) => {
                if result.is_empty() && options.failover {
                    debug!(provider = %selected, "empty result, failing over");
                    return self
                        .provider_for(selected.other())
                        .generate(prompt, schema, params)
                        .await;
                }
                Ok(result)
            }
            Err(err) => {
                if options.failover {
                    warn!(provider = %selected, error = %err, "provider failed, failing over");
                    self.provider_for(selected.other())
                        .generate(prompt, schema, params)
                        .await
                        .map_err(|e| {
                            error!(error = %e, "failover provider also failed");
                            e
                        })
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Streaming variant of [`invoke`](Self::invoke).
    ///
    /// Selection and failover apply to stream initiation only. If no
    /// provider can start a stream the error is logged and the returned
    /// stream yields no fragments.
    pub async fn invoke_stream(
        &self,
        prompt: &str,
        schema: &Value,
        options: &InvokeOptions,
    ) -> TextStream {
        let selected = options.provider.unwrap_or(self.default_provider);
        let params = options.model_parameters.as_ref();

        match self
            .provider_for(selected)
            .generate_stream(prompt, schema, params)
            .await
        {
            Ok(stream) => stream,
            Err(err) if options.failover => {
                warn!(provider = %selected, error = %err, "stream init failed, failing over");
                match self
                    .provider_for(selected.other())
                    .generate_stream(prompt, schema, params)
                    .await
                {
                    Ok(stream) => stream,
                    Err(err) => {
                        error!(error = %err, "failover stream init also failed");
                        empty_stream()
                    }
                }
            }
            Err(err) => {
                error!(provider = %selected, error = %err, "stream init failed");
                empty_stream()
            }
        }
    }
}

fn empty_stream() -> TextStream {
    Box::pin(futures_util::stream::empty())
}
