//! Canopy Clustering Pipeline
//!
//! The offline batch pipeline that clusters chat conversations into a
//! taxonomy of topic labels via iterative LLM calls, plus the utilities it
//! is built from.
//!
//! # Stages
//!
//! Data flows strictly forward:
//!
//! ```text
//! load -> reduce (truncate | summarize) -> shuffle + batch
//!      -> seed taxonomy -> refine per batch -> review -> persist
//! ```
//!
//! Malformed LLM responses degrade to the last known-good taxonomy and are
//! logged; only structural prerequisite failures (empty dataset, no
//! taxonomy ever produced) abort a run.
//!
//! # Utilities
//!
//! - [`truncate`]: token-budget truncation over the o200k_base tokenizer
//! - [`semaphore`]: FIFO counting semaphore bounding in-flight LLM calls
//! - [`batch`]: deterministic partitioning and uniform shuffling

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod semaphore;
pub mod source;
pub mod truncate;

// Re-exports for convenience
pub use config::{PipelineConfig, ReduceMode};
pub use error::PipelineError;
pub use pipeline::{ClusterPipeline, PipelineReport};
pub use semaphore::Semaphore;
pub use source::JsonlSource;
