//! The taxonomy clustering pipeline
//!
//! Orchestrates a run over a record source and the LLM client:
//! load, reduce (truncate or summarize), shuffle and batch, seed an
//! initial cluster table from the first batch, refine it across the
//! remaining batches in strict sequence, review the final table, and
//! persist the surviving entries as JSONL.
//!
//! Malformed LLM responses never lose state: a failed parse keeps the
//! previous table and the run continues. Only structural prerequisite
//! failures (no batches, no taxonomy ever produced) abort.

use crate::batch::{shuffle_in_place, split_into_batches};
use crate::config::{PipelineConfig, ReduceMode};
use crate::error::PipelineError;
use crate::output::{timestamped_path, write_jsonl};
use crate::prompts;
use crate::semaphore::Semaphore;
use crate::truncate::{truncate_to_tokens, TruncateOptions};
use canopy_domain::{ChatRecord, ClusterTable, LlmParse, RecordSource, SeedClusterList};
use canopy_llm::{InvokeOptions, LlmClient};
use futures_util::future;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of a completed pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Records loaded from the data source
    pub records_loaded: usize,

    /// Number of batches actually produced
    pub batches_processed: usize,

    /// The reviewed final taxonomy
    pub final_table: ClusterTable,

    /// Where the final entries were written; `None` when the table was empty
    pub output_path: Option<PathBuf>,
}

/// Expected shape of a summarization response
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

/// Orchestrates a clustering run
///
/// Owns the cluster table exclusively for the duration of the run; each
/// refinement step replaces it wholesale, so a failed step is free to
/// retry against unchanged state.
pub struct ClusterPipeline<S: RecordSource> {
    source: S,
    llm: Arc<LlmClient>,
    config: PipelineConfig,
}

impl<S> ClusterPipeline<S>
where
    S: RecordSource,
    S::Error: std::fmt::Display,
{
    /// Create a pipeline, validating the configuration up front
    pub fn new(
        source: S,
        llm: Arc<LlmClient>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            source,
            llm,
            config,
        })
    }

    /// Run the pipeline to completion
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        // Loading
        let records = self
            .source
            .load(self.config.record_limit)
            .map_err(|e| PipelineError::Source(e.to_string()))?;
        if records.is_empty() {
            error!("no records loaded from the data source");
        }
        info!(rows = records.len(), "records loaded");
        let records_loaded = records.len();

        // Reducing
        let reduced = match self.config.reduce_mode {
            ReduceMode::Truncate => self.truncate_records(records),
            ReduceMode::Summarize => self.summarize_records(records).await?,
        };

        // Batching: shuffle first, then partition deterministically
        let mut shuffled = reduced;
        shuffle_in_place(&mut shuffled, &mut rand::rng());
        let batches = split_into_batches(shuffled, self.config.batch_count)?;
        if batches.is_empty() {
            return Err(PipelineError::Aborted("no batches produced".to_string()));
        }
        info!(batches = batches.len(), "dataset shuffled and batched");

        // Seeding
        let mut table = self.seed_table(&batches[0]).await?;

        // Refining: strictly sequential; step i+1 sees the table from step i
        info!("starting batch iterations");
        for (index, batch) in batches.iter().enumerate().skip(1) {
            let Some(current) = table.as_ref() else {
                error!("no clusters available for assignment; halting refinement");
                break;
            };

            let prompt = prompts::cluster_update_prompt(
                current,
                batch,
                &self.config.use_case,
                self.config.max_clusters,
                self.config.label_words,
                self.config.suggestion_words,
            );
            let response = self
                .llm
                .invoke(
                    &prompt,
                    &prompts::updated_cluster_schema(),
                    &InvokeOptions::with_failover(),
                )
                .await?;

            match LlmParse::<ClusterTable>::from_response(&response) {
                LlmParse::Parsed(updated) => {
                    info!(
                        batch = index,
                        clusters = updated.entries().len(),
                        rating = updated.table_rating.as_ref().map(|r| r.rating),
                        "cluster table updated"
                    );
                    table = Some(updated);
                }
                LlmParse::Unparsed(_) => {
                    warn!(
                        batch = index,
                        "failed to parse updated cluster table; keeping previous table"
                    );
                }
            }
        }

        // Reviewing
        let Some(pre_review) = table else {
            return Err(PipelineError::Aborted(
                "no taxonomy produced; nothing to review".to_string(),
            ));
        };
        let final_table = self.review_table(pre_review).await?;

        // Persisting
        let output_path = if final_table.entries().is_empty() {
            error!("no final cluster entries to write");
            None
        } else {
            let path = timestamped_path(&self.config.output_dir, "final_clusters");
            write_jsonl(final_table.entries(), &path)?;
            Some(path)
        };

        Ok(PipelineReport {
            records_loaded,
            batches_processed: batches.len(),
            final_table,
            output_path,
        })
    }

    /// Reduce stage, truncate mode: bound each transcript to the token
    /// budget and store it as the record's summary
    fn truncate_records(&self, records: Vec<ChatRecord>) -> Vec<ChatRecord> {
        info!(
            budget = self.config.truncate_tokens,
            "truncating each conversation to the token budget"
        );
        records
            .into_iter()
            .map(|mut record| {
                let transcript = record.transcript();
                record.summary = Some(truncate_to_tokens(
                    &transcript,
                    self.config.truncate_tokens,
                    TruncateOptions::default(),
                ));
                record
            })
            .collect()
    }

    /// Reduce stage, summarize mode: submit every record concurrently,
    /// bounded by the semaphore, and snapshot the results before
    /// clustering begins
    async fn summarize_records(
        &self,
        records: Vec<ChatRecord>,
    ) -> Result<Vec<ChatRecord>, PipelineError> {
        info!(
            rows = records.len(),
            concurrency = self.config.summary_concurrency,
            "starting summarization"
        );
        let semaphore = Semaphore::new(self.config.summary_concurrency)?;
        let schema = prompts::summary_schema();

        let tasks = records.into_iter().map(|mut record| {
            let semaphore = &semaphore;
            let schema = &schema;
            async move {
                semaphore
                    .run(async {
                        let transcript = record.transcript();
                        let prompt = prompts::summarization_prompt(
                            &transcript,
                            &self.config.use_case,
                            self.config.summary_words,
                        );
                        let response = self
                            .llm
                            .invoke(&prompt, schema, &InvokeOptions::with_failover())
                            .await?;

                        // Fall back to the raw response when it does not
                        // parse as `{ summary }`
                        let summary = match LlmParse::<SummaryResponse>::from_response(&response) {
                            LlmParse::Parsed(parsed) => parsed.summary,
                            LlmParse::Unparsed(raw) => raw,
                        };
                        record.summary = Some(summary);
                        Ok::<ChatRecord, PipelineError>(record)
                    })
                    .await
            }
        });

        let summarized = future::join_all(tasks)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let snapshot_path = timestamped_path(&self.config.output_dir, "summaries");
        info!(path = %snapshot_path.display(), "summarization completed, writing snapshot");
        write_jsonl(&summarized, &snapshot_path)?;

        Ok(summarized)
    }

    /// Seeding stage: propose an initial cluster table from the first batch
    async fn seed_table(
        &self,
        batch: &[ChatRecord],
    ) -> Result<Option<ClusterTable>, PipelineError> {
        let prompt = prompts::initial_clusters_prompt(
            batch,
            &self.config.use_case,
            self.config.max_clusters,
            self.config.label_words,
        );
        let response = self
            .llm
            .invoke(
                &prompt,
                &prompts::seed_cluster_schema(),
                &InvokeOptions::with_failover(),
            )
            .await?;

        match LlmParse::<SeedClusterList>::from_response(&response) {
            LlmParse::Parsed(seed) => {
                let table: ClusterTable = seed.into();
                info!(clusters = table.entries().len(), "seed clusters generated");
                Ok(Some(table))
            }
            LlmParse::Unparsed(_) => {
                error!("failed to parse initial cluster response");
                Ok(None)
            }
        }
    }

    /// Reviewing stage: a final quality pass over the table without fresh
    /// batch data; an unparsable response keeps the pre-review table
    async fn review_table(&self, table: ClusterTable) -> Result<ClusterTable, PipelineError> {
        info!(
            clusters = table.entries().len(),
            "reviewing final cluster table"
        );
        let prompt = prompts::review_prompt(
            &table,
            &self.config.use_case,
            self.config.max_clusters,
            self.config.label_words,
            self.config.suggestion_words,
        );
        let response = self
            .llm
            .invoke(
                &prompt,
                &prompts::updated_cluster_schema(),
                &InvokeOptions::with_failover(),
            )
            .await?;

        match LlmParse::<ClusterTable>::from_response(&response) {
            LlmParse::Parsed(reviewed) => {
                info!(
                    clusters = reviewed.entries().len(),
                    rating = reviewed.table_rating.as_ref().map(|r| r.rating),
                    "review complete"
                );
                Ok(reviewed)
            }
            LlmParse::Unparsed(_) => {
                warn!("failed to parse reviewed cluster table; keeping pre-review table");
                Ok(table)
            }
        }
    }
}
