//! Error types for the clustering pipeline

use thiserror::Error;

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Semaphore constructed with a zero capacity
    #[error("Concurrency capacity must be a positive integer (got {0})")]
    InvalidConcurrency(usize),

    /// Batch split requested with a zero batch count
    #[error("Batch count must be a positive integer (got {0})")]
    InvalidBatchCount(usize),

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data source failed to load records
    #[error("Data source error: {0}")]
    Source(String),

    /// LLM invocation failed past failover
    #[error("LLM error: {0}")]
    Llm(#[from] canopy_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structural prerequisite failure; the run cannot continue
    #[error("Pipeline aborted: {0}")]
    Aborted(String),
}
