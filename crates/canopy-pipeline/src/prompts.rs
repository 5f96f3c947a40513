//! Prompt construction and output schemas for the clustering calls
//!
//! Prompts are parameter-driven text generators; the schemas describe the
//! JSON shapes providers are asked to produce. Adherence is closest-effort,
//! so the pipeline parses every response defensively.

use canopy_domain::{ChatRecord, ClusterTable};
use serde_json::{json, Value};

/// Render records as the markdown summary list embedded in prompts:
/// one `## <id>` heading per record followed by its summary.
pub fn summaries_to_markdown(records: &[ChatRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let summary = record
            .summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("*<no summary>*");
        out.push_str(&format!("\n## {}\n{}", record.display_id(), summary));
    }
    out
}

fn table_json(table: &ClusterTable) -> String {
    serde_json::to_string_pretty(table).unwrap_or_default()
}

const QUALITY_REQUIREMENTS: &str = r#"## Quality
- **No overlap or contradiction** among categories.
- The name is concise and clear for the category. Use only phrases that are specific to each category and avoid phrases common to all categories.
- The **description** differentiates the category from the other categories.
- **Name** and **description** can **accurately** and **consistently** classify new data points **without ambiguity**.
- **Name** and **description** are consistent with each other.
- Output categories match the data as closely as possible, without missing important categories or adding unnecessary ones.
- Output categories should serve the given use case well.
- Output categories should be specific and meaningful. Do not invent categories that are not in the data."#;

fn requirements_block(max_clusters: usize, label_words: usize) -> String {
    format!(
        "# Requirements:\n\
         - name: the category name should be **within {label_words} words**. It can be either a verb phrase or a noun phrase, whichever is more appropriate.\n\
         - The total number of categories should be **no more than {max_clusters}**.\n\
         {QUALITY_REQUIREMENTS}"
    )
}

fn table_tips(max_clusters: usize) -> String {
    format!(
        "# Tips:\n\
         - The cluster table should be a **flat list** of mutually exclusive categories. Sort them based on semantic relatedness.\n\
         - You can have fewer than {max_clusters} categories in the cluster table, but **do not exceed the limit**.\n\
         - Be specific about each category. **Do not include vague categories** such as \"General\", \"Miscellaneous\", \"Other\" or \"Undefined\" in the cluster table.\n\
         - You can ignore low quality or ambiguous data points."
    )
}

fn review_questions(max_clusters: usize, suggestion_words: usize) -> String {
    format!(
        "# Questions:\n\
         ## Q1: Review the given reference table and provide a rating score for it. The rating score should be an integer between 0 and 100; a higher score means better quality. Consider the following factors:\n\
         - **Intrinsic quality**\n\
           - 1.) Whether the cluster table meets the *Requirements* section, with clear and consistent category names and descriptions, and no overlap or contradiction among categories.\n\
           - 2.) Whether the categories in the cluster table are relevant for the given use case.\n\
           - 3.) Whether the cluster table includes any vague categories such as \"Other\", \"General\", \"Miscellaneous\", \"Undefined\", or \"Uncategorized\".\n\
         - **Extrinsic quality**\n\
           - 1.) Whether the cluster table can accurately and consistently classify the input data without ambiguity.\n\
           - 2.) Whether categories appear in the input data but are missing from the cluster table.\n\
           - 3.) Whether the cluster table contains unnecessary categories that do not appear in the input data.\n\
         \n\
         ## Q2: Based on your review, decide if you need to edit the reference table to improve its quality. If yes, suggest potential edits **within {suggestion_words} words**. If no, put 'N/A'.\n\
         \n\
         Tips:\n\
         - You can edit a category name or description, or remove a category. You can also merge or add categories if needed. Your edits should meet the *Requirements* section.\n\
         - The cluster table should be a **flat list** of mutually exclusive categories. Sort them based on semantic relatedness.\n\
         - You can have fewer than {max_clusters} categories in the cluster table, but **do not exceed the limit**.\n\
         - Be specific about each category. **Do not include vague categories** such as \"General\", \"Miscellaneous\", \"Other\" or \"Undefined\" in the cluster table.\n\
         - You can ignore low quality or ambiguous data points.\n\
         \n\
         ## Q3: If you decide to edit the reference table, provide your updated reference table. If you decide not to edit it, output the original reference table."
    )
}

/// Prompt asking for the initial seed taxonomy from the first batch
pub fn initial_clusters_prompt(
    records: &[ChatRecord],
    use_case: &str,
    max_clusters: usize,
    label_words: usize,
) -> String {
    format!(
        "# Goal:\n\
         Your goal is to classify the input data into meaningful categories for the given use case.\n\
         - **Data**: The input is a markdown list with summaries for a set of human-AI conversations, including the following fields:\n\
           - id: conversation identifier\n\
           - summary: conversation summary\n\
         - **Use case**: {use_case}\n\
         {requirements}\n\
         \n\
         # Data:\n\
         {data}\n\
         \n\
         {tips}",
        requirements = requirements_block(max_clusters, label_words),
        data = summaries_to_markdown(records),
        tips = table_tips(max_clusters),
    )
}

/// Prompt asking for a bounded-length summary of one conversation
pub fn summarization_prompt(transcript: &str, use_case: &str, summary_words: usize) -> String {
    format!(
        "# Goal:\n\
         Summarize the input text for the given use case.\n\
         Your input is a conversation history between a User and an AI agent.\n\
         The use case is: {use_case}\n\
         \n\
         # Data:\n\
         {transcript}\n\
         \n\
         # Requirements:\n\
         - Provide a summary of the input text **in {summary_words} words or less** that captures the use case.\n\
         \n\
         # Tips:\n\
         - The summary will represent the input data for clustering in the next step.\n\
         - Be concise and clear.\n\
         - Do not add phrases like \"This is the summary of ...\" or \"Summary:\" or \"Here is a summary of the conversation\".\n\
         - Within {summary_words} words, include as much of the information relevant to the use case as possible.\n\
         - Do not include any introductory or concluding remarks.\n\
         - Do not include any line breaks in the summary.\n\
         - Provide your answer in **English** only."
    )
}

/// Prompt asking the model to rate the current table against a batch and
/// produce an updated table
pub fn cluster_update_prompt(
    table: &ClusterTable,
    records: &[ChatRecord],
    use_case: &str,
    max_clusters: usize,
    label_words: usize,
    suggestion_words: usize,
) -> String {
    format!(
        "# Goal:\n\
         Your goal is to review the given reference table based on the input data for the specified use case, then update the reference table if needed.\n\
         - You will be given a reference cluster table, which is built on existing data. The reference table will be used to classify new data points.\n\
         - You will compare the input data with the reference table, output a rating score for the quality of the reference table, suggest potential edits, and update the reference table if needed.\n\
         - **Reference cluster table**: a JSON object listing each category's label and description.\n\
         - **Data**: a markdown list with summaries for a set of human-AI conversations, including the following fields:\n\
           - id: conversation identifier\n\
           - summary: conversation summary\n\
         - **Use case**: {use_case}\n\
         {requirements}\n\
         \n\
         # Reference cluster table:\n\
         {table}\n\
         \n\
         # Data:\n\
         {data}\n\
         \n\
         {questions}",
        requirements = requirements_block(max_clusters, label_words),
        table = table_json(table),
        data = summaries_to_markdown(records),
        questions = review_questions(max_clusters, suggestion_words),
    )
}

/// Prompt asking for a final quality review of the table against the
/// requirements alone (no fresh batch data)
pub fn review_prompt(
    table: &ClusterTable,
    use_case: &str,
    max_clusters: usize,
    label_words: usize,
    suggestion_words: usize,
) -> String {
    format!(
        "# Goal:\n\
         Your goal is to review the given reference cluster table based on the requirements and the specified use case, then update the reference table if needed.\n\
         - You will be given a reference cluster table, which is built on existing data. The reference table will be used to classify new data points.\n\
         - You will output a rating score for the quality of the reference table, suggest potential edits, and update the reference table if needed.\n\
         - **Reference cluster table**: a JSON object listing each category's label and description.\n\
         - **Use case**: {use_case}\n\
         {requirements}\n\
         \n\
         # Reference cluster table:\n\
         {table}\n\
         \n\
         {questions}",
        requirements = requirements_block(max_clusters, label_words),
        table = table_json(table),
        questions = review_questions(max_clusters, suggestion_words),
    )
}

fn cluster_entry_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "label": {
                "type": "string",
                "description": "The name of the cluster"
            },
            "description": {
                "type": "string",
                "description": "The description of the cluster"
            }
        },
        "required": ["label", "description"],
        "additionalProperties": false
    })
}

/// Schema for the summarization call: `{ summary }`
pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "The summary of the conversation, focusing on the main topic and key points"
            }
        },
        "required": ["summary"],
        "additionalProperties": false
    })
}

/// Schema for the seeding call: `{ clusters: [...] }`
pub fn seed_cluster_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "clusters": {
                "type": "array",
                "description": "An array of clusters and their descriptions for the seed taxonomy",
                "items": cluster_entry_schema()
            }
        },
        "required": ["clusters"],
        "additionalProperties": false
    })
}

/// Schema for the update and review calls: `{ updatedTable, tableRating }`
pub fn updated_cluster_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "updatedTable": {
                "type": "array",
                "description": "An array of clusters and their descriptions",
                "items": cluster_entry_schema()
            },
            "tableRating": {
                "type": "object",
                "description": "The rating of the reference table and its explanation",
                "properties": {
                    "rating": {
                        "type": "integer",
                        "description": "Quality score of the reference table, from 0 to 100"
                    },
                    "explanation": {
                        "type": "string",
                        "description": "The explanation of the rating"
                    },
                    "suggestedEdits": {
                        "type": "string",
                        "description": "Suggested edits for the cluster table, if applicable"
                    }
                },
                "required": ["rating", "explanation"],
                "additionalProperties": false
            }
        },
        "required": ["updatedTable", "tableRating"],
        "additionalProperties": false
    })
}
