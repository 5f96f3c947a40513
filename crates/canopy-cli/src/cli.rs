//! CLI argument definitions and parsing.

use canopy_llm::ProviderKind;
use clap::Parser;
use std::path::PathBuf;

/// Canopy - cluster chat conversations into a topic taxonomy.
#[derive(Debug, Parser)]
#[command(name = "canopy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory of .jsonl conversation files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for JSONL outputs
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of records to load
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of refinement batches
    #[arg(long)]
    pub batches: Option<usize>,

    /// Maximum number of cluster labels
    #[arg(long)]
    pub max_clusters: Option<usize>,

    /// Summarize conversations with the LLM instead of truncating
    #[arg(long, conflicts_with = "truncate")]
    pub summarize: bool,

    /// Truncate conversations to a token budget
    #[arg(long)]
    pub truncate: bool,

    /// Concurrency ceiling for summarization calls
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// LLM provider
    #[arg(long, value_enum, env = "LLM_PROVIDER", default_value = "azure")]
    pub provider: ProviderArg,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Provider choices exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    /// Azure OpenAI chat completions
    Azure,
    /// Local Ollama instance
    Ollama,
}

impl From<ProviderArg> for ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Azure => ProviderKind::Azure,
            ProviderArg::Ollama => ProviderKind::Ollama,
        }
    }
}
