//! Configuration for the clustering pipeline

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How records are reduced before clustering
///
/// Exactly one mode is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceMode {
    /// Truncate each transcript to a token budget (cheap)
    Truncate,
    /// Summarize each transcript with the LLM (costlier, smaller prompts)
    Summarize,
}

impl Default for ReduceMode {
    fn default() -> Self {
        ReduceMode::Truncate
    }
}

/// Configuration for a clustering run
///
/// Defaults mirror a small exploratory run: 100 records across 20 batches,
/// truncate mode, at most 5 cluster labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Free-text description of what the taxonomy should capture
    #[serde(default = "default_use_case")]
    pub use_case: String,

    /// Maximum number of cluster labels in the taxonomy
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,

    /// Target word count for per-conversation summaries
    #[serde(default = "default_summary_words")]
    pub summary_words: usize,

    /// Maximum word count for a cluster label
    #[serde(default = "default_label_words")]
    pub label_words: usize,

    /// Word limit for suggested table edits
    #[serde(default = "default_suggestion_words")]
    pub suggestion_words: usize,

    /// Reduce stage mode
    #[serde(default)]
    pub reduce_mode: ReduceMode,

    /// Token budget per transcript in truncate mode
    #[serde(default = "default_truncate_tokens")]
    pub truncate_tokens: usize,

    /// Maximum number of records to load from the data source
    #[serde(default = "default_record_limit", skip_serializing_if = "Option::is_none")]
    pub record_limit: Option<usize>,

    /// Number of batches the shuffled dataset is split into
    #[serde(default = "default_batch_count")]
    pub batch_count: usize,

    /// Maximum simultaneously in-flight summarization calls
    #[serde(default = "default_summary_concurrency")]
    pub summary_concurrency: usize,

    /// Directory of input `.jsonl` conversation files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for JSONL outputs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_use_case() -> String {
    "Primary area of interest. This will include the main topic of the conversation \
     or any other specific subject that the user is interested in discussing or \
     learning about."
        .to_string()
}

fn default_max_clusters() -> usize {
    5
}

fn default_summary_words() -> usize {
    50
}

fn default_label_words() -> usize {
    3
}

fn default_suggestion_words() -> usize {
    20
}

fn default_truncate_tokens() -> usize {
    250
}

fn default_record_limit() -> Option<usize> {
    Some(100)
}

fn default_batch_count() -> usize {
    20
}

fn default_summary_concurrency() -> usize {
    4
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_case: default_use_case(),
            max_clusters: default_max_clusters(),
            summary_words: default_summary_words(),
            label_words: default_label_words(),
            suggestion_words: default_suggestion_words(),
            reduce_mode: ReduceMode::default(),
            truncate_tokens: default_truncate_tokens(),
            record_limit: default_record_limit(),
            batch_count: default_batch_count(),
            summary_concurrency: default_summary_concurrency(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration
    ///
    /// Invalid values are rejected here, never silently clamped.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_clusters == 0 {
            return Err(PipelineError::Config(
                "max_clusters must be greater than 0".to_string(),
            ));
        }
        if self.summary_words == 0 {
            return Err(PipelineError::Config(
                "summary_words must be greater than 0".to_string(),
            ));
        }
        if self.label_words == 0 {
            return Err(PipelineError::Config(
                "label_words must be greater than 0".to_string(),
            ));
        }
        if self.suggestion_words == 0 {
            return Err(PipelineError::Config(
                "suggestion_words must be greater than 0".to_string(),
            ));
        }
        if self.truncate_tokens == 0 {
            return Err(PipelineError::Config(
                "truncate_tokens must be greater than 0".to_string(),
            ));
        }
        if self.batch_count == 0 {
            return Err(PipelineError::InvalidBatchCount(self.batch_count));
        }
        if self.summary_concurrency == 0 {
            return Err(PipelineError::InvalidConcurrency(self.summary_concurrency));
        }
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        toml::from_str(toml_str)
            .map_err(|e| PipelineError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_clusters, 5);
        assert_eq!(config.batch_count, 20);
        assert_eq!(config.reduce_mode, ReduceMode::Truncate);
    }

    #[test]
    fn test_zero_batch_count_is_rejected() {
        let config = PipelineConfig {
            batch_count: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidBatchCount(0))
        ));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = PipelineConfig {
            summary_concurrency: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn test_zero_max_clusters_is_rejected() {
        let config = PipelineConfig {
            max_clusters: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig {
            reduce_mode: ReduceMode::Summarize,
            record_limit: None,
            ..PipelineConfig::default()
        };
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();

        assert_eq!(parsed.reduce_mode, ReduceMode::Summarize);
        assert_eq!(parsed.max_clusters, config.max_clusters);
        assert_eq!(parsed.batch_count, config.batch_count);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let parsed = PipelineConfig::from_toml("").unwrap();
        assert_eq!(parsed.truncate_tokens, 250);
        assert_eq!(parsed.record_limit, Some(100));
        assert_eq!(parsed.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_reduce_mode_toml_names() {
        let parsed = PipelineConfig::from_toml("reduce_mode = \"summarize\"").unwrap();
        assert_eq!(parsed.reduce_mode, ReduceMode::Summarize);
    }
}
