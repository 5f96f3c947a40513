//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline error, including aborted runs
    #[error("{0}")]
    Pipeline(#[from] canopy_pipeline::PipelineError),

    /// LLM layer error
    #[error("LLM error: {0}")]
    Llm(#[from] canopy_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
