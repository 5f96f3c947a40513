//! Canopy CLI - offline clustering of chat conversations into a topic
//! taxonomy.

use canopy_cli::{config, Cli, Result};
use canopy_llm::{
    AzureOpenAiProvider, LlmClient, LlmProvider, OllamaProvider, ProviderKind,
    UnavailableProvider,
};
use canopy_pipeline::{ClusterPipeline, JsonlSource};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(&cli)?;
    let provider: ProviderKind = cli.provider.into();
    info!(%provider, mode = ?config.reduce_mode, "starting clustering run");

    let llm = build_llm_client(provider);
    let source = JsonlSource::new(config.data_dir.clone());
    let pipeline = ClusterPipeline::new(source, llm, config)?;

    let report = pipeline.run().await?;
    match &report.output_path {
        Some(path) => info!(
            clusters = report.final_table.entries().len(),
            path = %path.display(),
            "clustering run complete"
        ),
        None => info!("clustering run complete; no entries to persist"),
    }

    Ok(())
}

/// Wire both providers from the environment. An unconfigured backend
/// becomes a placeholder that fails at call time, so failover to the other
/// provider still applies.
fn build_llm_client(default_provider: ProviderKind) -> Arc<LlmClient> {
    let azure: Arc<dyn LlmProvider> = match AzureOpenAiProvider::from_env() {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            warn!(error = %e, "Azure OpenAI not configured");
            Arc::new(UnavailableProvider::new(e.to_string()))
        }
    };

    let base_url = std::env::var("OLLAMA_BASE_URL")
        .unwrap_or_else(|_| canopy_llm::ollama::DEFAULT_ENDPOINT.to_string());
    let model = std::env::var("OLLAMA_MODEL")
        .unwrap_or_else(|_| canopy_llm::ollama::DEFAULT_MODEL.to_string());
    let ollama: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(base_url, model));

    Arc::new(LlmClient::new(azure, ollama, default_provider))
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
