//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. Implementations live in other crates.

use crate::ChatRecord;

/// Trait for data sources yielding chat records
///
/// Implemented by the infrastructure layer (canopy-pipeline's JSONL source).
/// Implementations handle missing or malformed row fields defensively
/// rather than failing the whole load.
pub trait RecordSource {
    /// Error type for load operations
    type Error;

    /// Load all available records, up to an optional limit
    fn load(&self, record_limit: Option<usize>) -> Result<Vec<ChatRecord>, Self::Error>;
}
