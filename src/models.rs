//! Core data models used throughout Claim Advisor.
//!
//! These types represent the uploads, documents, chunks, risks, and chat
//! messages that flow through the analysis and chat pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Document category an upload is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Contract,
    Official,
    Meeting,
    Email,
    Daily,
    Etc,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Contract,
        Category::Official,
        Category::Meeting,
        Category::Email,
        Category::Daily,
        Category::Etc,
    ];

    /// Short identifier used on the command line and as directory name.
    pub fn slug(self) -> &'static str {
        match self {
            Category::Contract => "contract",
            Category::Official => "official",
            Category::Meeting => "meeting",
            Category::Email => "email",
            Category::Daily => "daily",
            Category::Etc => "etc",
        }
    }

    /// Human-readable label, used in prompts and source attributions.
    pub fn label(self) -> &'static str {
        match self {
            Category::Contract => "Contract",
            Category::Official => "Official Letter",
            Category::Meeting => "Meeting Minutes",
            Category::Email => "Email",
            Category::Daily => "Daily Report",
            Category::Etc => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Category::ALL.iter().map(|c| c.slug()).collect();
                anyhow::anyhow!(
                    "Unknown category: '{}'. Expected one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

/// A file as supplied by the user, before text extraction.
#[derive(Debug, Clone)]
pub struct Upload {
    pub category: Category,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Extracted document held in session memory for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub category: Category,
    pub filename: String,
    pub text: String,
}

/// A window of a document's text, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub category: Category,
    pub filename: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// Metadata stored next to every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub category: String,
    pub filename: String,
    pub chunk_index: i64,
}

/// A nearest-neighbour hit returned by the retriever.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// One extracted claim risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat message, used both for session transcripts and model requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_slugs_case_insensitively() {
        assert_eq!("Contract".parse::<Category>().unwrap(), Category::Contract);
        assert_eq!(" daily ".parse::<Category>().unwrap(), Category::Daily);
        let err = "invoice".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("contract, official"));
    }

    #[test]
    fn chat_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
