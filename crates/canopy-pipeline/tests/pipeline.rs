//! End-to-end pipeline runs over synthetic records with mocked providers

use canopy_domain::{ChatRecord, RawMessage, RecordSource};
use canopy_llm::{LlmClient, MockProvider, ProviderKind};
use canopy_pipeline::{ClusterPipeline, PipelineConfig, PipelineError, ReduceMode};
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

/// In-memory record source for tests
struct VecSource(Vec<ChatRecord>);

impl RecordSource for VecSource {
    type Error = Infallible;

    fn load(&self, record_limit: Option<usize>) -> Result<Vec<ChatRecord>, Self::Error> {
        let mut records = self.0.clone();
        if let Some(limit) = record_limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

fn synthetic_records(count: usize) -> Vec<ChatRecord> {
    let topics = ["cooking", "travel", "homework", "gaming", "fitness"];
    (0..count)
        .map(|i| ChatRecord {
            id: Some(format!("conv-{}", i)),
            conversation_hash: None,
            conversation: vec![
                RawMessage::new("user", format!("Tell me about {}", topics[i % topics.len()])),
                RawMessage::new("assistant", format!("Sure, {} is a broad topic.", topics[i % topics.len()])),
            ],
            summary: None,
        })
        .collect()
}

fn seed_response() -> String {
    r#"{"clusters": [
        {"label": "Cooking", "description": "Food preparation and recipes"},
        {"label": "Travel", "description": "Trips and destinations"},
        {"label": "Homework Help", "description": "School questions"}
    ]}"#
    .to_string()
}

fn update_response() -> String {
    r#"{
        "updatedTable": [
            {"label": "Cooking", "description": "Food preparation and recipes"},
            {"label": "Travel", "description": "Trips and destinations"},
            {"label": "Homework Help", "description": "School questions"},
            {"label": "Gaming", "description": "Video games and strategy"}
        ],
        "tableRating": {"rating": 82, "explanation": "mostly exclusive categories"}
    }"#
    .to_string()
}

fn client_over(azure: MockProvider) -> Arc<LlmClient> {
    Arc::new(LlmClient::new(
        Arc::new(azure),
        Arc::new(MockProvider::new("unused secondary")),
        ProviderKind::Azure,
    ))
}

fn config_for(output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        record_limit: Some(100),
        batch_count: 20,
        max_clusters: 5,
        reduce_mode: ReduceMode::Truncate,
        output_dir: output_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(prefix))
        })
        .collect()
}

#[tokio::test]
async fn full_run_produces_bounded_taxonomy_and_output_file() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new(update_response());
    azure.push_response(seed_response());

    let pipeline = ClusterPipeline::new(
        VecSource(synthetic_records(100)),
        client_over(azure.clone()),
        config_for(out.path()),
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.records_loaded, 100);
    assert_eq!(report.batches_processed, 20);
    assert!(!report.final_table.entries().is_empty());
    assert!(report.final_table.entries().len() <= 5);

    // 1 seed + 19 updates + 1 review
    assert_eq!(azure.call_count(), 21);

    let path = report.output_path.expect("output file should be written");
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), report.final_table.entries().len());
    for line in lines {
        let entry: canopy_domain::ClusterEntry = serde_json::from_str(line).unwrap();
        assert!(!entry.label.is_empty());
    }
}

#[tokio::test]
async fn unparsable_responses_abort_with_no_output() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new("this is not json");
    let pipeline = ClusterPipeline::new(
        VecSource(synthetic_records(100)),
        client_over(azure.clone()),
        config_for(out.path()),
    )
    .unwrap();

    let result = pipeline.run().await;
    assert!(matches!(result, Err(PipelineError::Aborted(_))));

    // The seed parse failed, so refinement halted before any update call
    assert_eq!(azure.call_count(), 1);
    assert!(files_with_prefix(out.path(), "final_clusters").is_empty());
}

#[tokio::test]
async fn failed_update_parse_keeps_previous_table() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new("garbage");
    azure.push_response(seed_response());
    // Batch 1 update fails to parse, batch 2 succeeds, review fails
    azure.push_response("garbage");
    azure.push_response(update_response());
    azure.push_response("garbage");

    let config = PipelineConfig {
        batch_count: 3,
        output_dir: out.path().to_path_buf(),
        ..config_for(out.path())
    };
    let pipeline = ClusterPipeline::new(
        VecSource(synthetic_records(9)),
        client_over(azure.clone()),
        config,
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();

    // The last parsed table (batch 2's update) survives the failed review
    assert_eq!(report.final_table.entries().len(), 4);
    assert_eq!(report.final_table.entries()[3].label, "Gaming");
    assert_eq!(
        report.final_table.table_rating.as_ref().map(|r| r.rating),
        Some(82)
    );
    assert_eq!(azure.call_count(), 4);
}

#[tokio::test]
async fn empty_dataset_aborts_before_any_llm_call() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new(update_response());
    let pipeline = ClusterPipeline::new(
        VecSource(Vec::new()),
        client_over(azure.clone()),
        config_for(out.path()),
    )
    .unwrap();

    let result = pipeline.run().await;
    assert!(matches!(result, Err(PipelineError::Aborted(_))));
    assert_eq!(azure.call_count(), 0);
}

#[tokio::test]
async fn record_limit_bounds_the_load() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new(update_response());
    azure.push_response(seed_response());

    let pipeline = ClusterPipeline::new(
        VecSource(synthetic_records(150)),
        client_over(azure),
        config_for(out.path()),
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.records_loaded, 100);
}

#[tokio::test]
async fn summarize_mode_snapshots_summaries_before_clustering() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new(update_response());
    for i in 0..8 {
        azure.push_response(format!("{{\"summary\": \"summary number {}\"}}", i));
    }
    azure.push_response(seed_response());

    let config = PipelineConfig {
        reduce_mode: ReduceMode::Summarize,
        summary_concurrency: 3,
        batch_count: 2,
        output_dir: out.path().to_path_buf(),
        ..config_for(out.path())
    };
    let pipeline = ClusterPipeline::new(
        VecSource(synthetic_records(8)),
        client_over(azure.clone()),
        config,
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();

    // 8 summaries + 1 seed + 1 update + 1 review
    assert_eq!(azure.call_count(), 11);
    assert!(report.output_path.is_some());

    let snapshots = files_with_prefix(out.path(), "summaries");
    assert_eq!(snapshots.len(), 1);
    let contents = std::fs::read_to_string(&snapshots[0]).unwrap();
    assert_eq!(contents.lines().count(), 8);

    // Every snapshot row carries the mocked summary text
    for line in contents.lines() {
        let record: ChatRecord = serde_json::from_str(line).unwrap();
        assert!(record.summary.unwrap().starts_with("summary number"));
    }
}

#[tokio::test]
async fn truncate_mode_rewrites_summaries_from_transcripts() {
    let out = tempfile::tempdir().unwrap();

    let azure = MockProvider::new(update_response());
    azure.push_response(seed_response());

    let config = PipelineConfig {
        batch_count: 1,
        output_dir: out.path().to_path_buf(),
        ..config_for(out.path())
    };
    let pipeline = ClusterPipeline::new(
        VecSource(synthetic_records(4)),
        client_over(azure.clone()),
        config,
    )
    .unwrap();

    let report = pipeline.run().await.unwrap();

    // Single batch: seed + review only, no update iterations
    assert_eq!(azure.call_count(), 2);
    assert_eq!(report.batches_processed, 1);
    assert!(report.output_path.is_some());
}
