//! Line-delimited record source
//!
//! Loads chat records from a directory of `.jsonl` files, one JSON object
//! per line. Rows are parsed defensively: unreadable lines and files are
//! logged and skipped rather than failing the load, and a missing data
//! directory yields zero records.

use crate::error::PipelineError;
use canopy_domain::{ChatRecord, RecordSource};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Chat-record source over a directory of `.jsonl` files
pub struct JsonlSource {
    data_dir: PathBuf,
}

impl JsonlSource {
    /// Create a source reading from `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl RecordSource for JsonlSource {
    type Error = PipelineError;

    fn load(&self, record_limit: Option<usize>) -> Result<Vec<ChatRecord>, Self::Error> {
        if !self.data_dir.exists() {
            error!(dir = %self.data_dir.display(), "data directory does not exist");
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.data_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();

        if files.is_empty() {
            error!(dir = %self.data_dir.display(), "no .jsonl files found in the data directory");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        'files: for path in &files {
            let contents = match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) => {
                    error!(file = %path.display(), error = %e, "failed to read data file");
                    continue;
                }
            };

            let mut file_rows = 0usize;
            for (line_no, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChatRecord>(line) {
                    Ok(record) => {
                        records.push(record);
                        file_rows += 1;
                    }
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "skipping malformed row"
                        );
                    }
                }
                if record_limit.is_some_and(|limit| records.len() >= limit) {
                    info!(file = %path.display(), rows = file_rows, "loaded data file");
                    break 'files;
                }
            }
            info!(file = %path.display(), rows = file_rows, "loaded data file");
        }

        info!(
            total = records.len(),
            files = files.len(),
            "aggregated rows from data directory"
        );
        Ok(records)
    }
}
