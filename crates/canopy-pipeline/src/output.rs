//! Line-delimited JSON output

use crate::error::PipelineError;
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write one JSON object per line, creating parent directories as needed
pub fn write_jsonl<T: Serialize>(items: &[T], path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    for item in items {
        let line = serde_json::to_string(item)?;
        writeln!(file, "{}", line)?;
    }

    info!(path = %path.display(), rows = items.len(), "wrote JSONL output");
    Ok(())
}

/// `<dir>/<prefix>_<timestamp>.jsonl` with a filesystem-safe local timestamp
pub fn timestamped_path(dir: &Path, prefix: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%dT%H-%M-%S");
    dir.join(format!("{}_{}.jsonl", prefix, timestamp))
}
