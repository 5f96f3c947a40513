//! Chat records and transcript rendering

use serde::{Deserialize, Serialize};

/// A single message within a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Speaker role as recorded in the dataset, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Message text
    pub content: String,
}

impl RawMessage {
    /// Create a message with an explicit role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: content.into(),
        }
    }

    /// Create a message without a role (role is inferred from position)
    pub fn untagged(content: impl Into<String>) -> Self {
        Self {
            role: None,
            content: content.into(),
        }
    }
}

/// One conversation loaded from the data source
///
/// Records are immutable after loading except for `summary`, which the
/// reduce stage overwrites with either a truncated transcript or an
/// LLM-generated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Dataset-provided identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Dataset-provided conversation hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_hash: Option<String>,

    /// Ordered message sequence
    #[serde(default)]
    pub conversation: Vec<RawMessage>,

    /// Reduced representation of the conversation, set by the reduce stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ChatRecord {
    /// Identifier used when rendering this record into a prompt:
    /// `id`, else `conversation_hash`, else a placeholder.
    pub fn display_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.conversation_hash.as_deref())
            .unwrap_or("(no id)")
    }

    /// Render the conversation as a flat transcript, one `Role: content`
    /// line per message.
    ///
    /// Roles collapse into two buckets: `assistant`/`ai`/`model`
    /// (case-insensitive) render as `AI`, any other recorded role as
    /// `User`. Messages without a role alternate by index, user first.
    pub fn transcript(&self) -> String {
        self.conversation
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let role = match &m.role {
                    Some(r) => {
                        let r = r.to_lowercase();
                        if r == "assistant" || r == "ai" || r == "model" {
                            "AI"
                        } else {
                            "User"
                        }
                    }
                    None => {
                        if i % 2 == 0 {
                            "User"
                        } else {
                            "AI"
                        }
                    }
                };
                format!("{}: {}", role, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
