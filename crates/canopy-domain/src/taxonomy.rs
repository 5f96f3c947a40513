//! Taxonomy types threaded through the refinement loop

use serde::{Deserialize, Serialize};

/// A named category in the taxonomy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    /// Short category label; word count is bounded by the prompt
    pub label: String,

    /// Free text distinguishing this category from its siblings
    #[serde(default)]
    pub description: String,
}

/// Quality score for a cluster table, produced by the update and review calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRating {
    /// 0-100, higher is better
    pub rating: i64,

    /// Why the table earned this rating
    pub explanation: String,

    /// Bounded-length edit suggestions, when the model has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_edits: Option<String>,
}

/// The evolving taxonomy: the single piece of state threaded through the
/// refinement loop.
///
/// Each refinement step replaces the whole table rather than editing it
/// field by field, so a failed step leaves the previous table intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTable {
    /// Current category entries
    pub updated_table: Vec<ClusterEntry>,

    /// Latest rating; absent on the seed table, which has never been rated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_rating: Option<TableRating>,
}

impl ClusterTable {
    /// The category entries, the part of the table that gets persisted
    pub fn entries(&self) -> &[ClusterEntry] {
        &self.updated_table
    }
}

/// Response shape of the initial seeding call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedClusterList {
    /// Seed categories proposed from the first batch
    pub clusters: Vec<ClusterEntry>,
}

impl From<SeedClusterList> for ClusterTable {
    fn from(seed: SeedClusterList) -> Self {
        Self {
            updated_table: seed.clusters,
            table_rating: None,
        }
    }
}
