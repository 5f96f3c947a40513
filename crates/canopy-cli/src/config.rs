//! Configuration loading: file values layered under CLI overrides.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use canopy_pipeline::{PipelineConfig, ReduceMode};
use std::fs;

/// Build the pipeline configuration from an optional TOML file and CLI
/// overrides. CLI values win over file values, which win over defaults.
pub fn load(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|e| CliError::Config(format!("cannot read {}: {}", path.display(), e)))?;
            PipelineConfig::from_toml(&contents)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(limit) = cli.limit {
        config.record_limit = Some(limit);
    }
    if let Some(batches) = cli.batches {
        config.batch_count = batches;
    }
    if let Some(max_clusters) = cli.max_clusters {
        config.max_clusters = max_clusters;
    }
    if let Some(concurrency) = cli.concurrency {
        config.summary_concurrency = concurrency;
    }
    if cli.summarize {
        config.reduce_mode = ReduceMode::Summarize;
    }
    if cli.truncate {
        config.reduce_mode = ReduceMode::Truncate;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cli = Cli::parse_from(["canopy"]);
        let config = load(&cli).unwrap();
        assert_eq!(config.batch_count, 20);
        assert_eq!(config.reduce_mode, ReduceMode::Truncate);
    }

    #[test]
    fn test_file_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "batch_count = 7\nreduce_mode = \"summarize\"\nmax_clusters = 8\n"
        )
        .unwrap();

        let cli = Cli::parse_from(["canopy", "--config", path.to_str().unwrap()]);
        let config = load(&cli).unwrap();

        assert_eq!(config.batch_count, 7);
        assert_eq!(config.max_clusters, 8);
        assert_eq!(config.reduce_mode, ReduceMode::Summarize);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "batch_count = 7\nreduce_mode = \"summarize\"\n").unwrap();

        let cli = Cli::parse_from([
            "canopy",
            "--config",
            path.to_str().unwrap(),
            "--batches",
            "3",
            "--truncate",
        ]);
        let config = load(&cli).unwrap();

        assert_eq!(config.batch_count, 3);
        assert_eq!(config.reduce_mode, ReduceMode::Truncate);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cli = Cli::parse_from(["canopy", "--batches", "0"]);
        assert!(load(&cli).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["canopy", "--config", "/no/such/file.toml"]);
        assert!(matches!(load(&cli), Err(CliError::Config(_))));
    }
}
