//! Canopy Domain Layer
//!
//! Core data model for the conversation-clustering pipeline. Defines the
//! record and taxonomy types that flow through every stage, the tagged
//! parse result for LLM responses, and the trait boundary for data sources.
//!
//! ## Key Concepts
//!
//! - **ChatRecord**: one conversation, loaded once; only its `summary` is
//!   rewritten during the reduce stage
//! - **ClusterTable**: the evolving taxonomy, replaced (never edited in
//!   place) at each refinement step
//! - **LlmParse**: `Parsed(T) | Unparsed(raw)` — call sites must handle the
//!   fallback case explicitly
//!
//! Infrastructure implementations (data loading, LLM providers) live in
//! other crates behind the traits defined here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod parse;
pub mod record;
pub mod taxonomy;
pub mod traits;

// Re-exports for convenience
pub use parse::LlmParse;
pub use record::{ChatRecord, RawMessage};
pub use taxonomy::{ClusterEntry, ClusterTable, SeedClusterList, TableRating};
pub use traits::RecordSource;
