//! Message codec
//!
//! Translates between the stored content payload of a message and the
//! canonical part-based representation shared by the HTTP surface, the
//! client, and the model-provider adapter. This module is the only place
//! that knows the payload encoding. Pure and synchronous; decoding never
//! fails outright, it degrades to best-effort text extraction.

use crate::store::{MessageRole, StoredMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// One typed content part of a canonical message
///
/// Only `Text` is meaningful when reconstructing conversation history.
/// `Reasoning` parts arrive from streaming model output and are persisted
/// alongside the text. Unrecognized part kinds deserialize as `Other` and
/// are preserved verbatim on write, dropped on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    Reasoning { text: String },
    #[serde(untagged)]
    Other(serde_json::Value),
}

impl Part {
    /// Construct a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Construct a reasoning part
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }

    /// True for parts that carry displayable text
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// The canonical in-memory message shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub id: String,
    pub role: MessageRole,
    pub parts: Vec<Part>,
    pub created_at: DateTime<Utc>,
}

impl CanonicalMessage {
    /// Create a canonical message with a fresh identity and current timestamp
    pub fn new(role: MessageRole, parts: Vec<Part>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            role,
            parts,
            created_at: Utc::now(),
        }
    }

    /// Create a canonical USER message from plain text
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![Part::text(text)])
    }

    /// Concatenation of all text parts, joined by newlines
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of parsing a stored content payload
///
/// A payload is either a well-formed list of typed parts or opaque text.
/// There is no error arm: malformed payloads land in `RawText`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    Parts(Vec<Part>),
    RawText(String),
}

/// Parse a stored payload into its tagged form
pub fn parse_payload(raw: &str) -> ParsedPayload {
    match serde_json::from_str::<Vec<Part>>(raw) {
        Ok(parts) => ParsedPayload::Parts(parts),
        Err(_) => ParsedPayload::RawText(raw.to_string()),
    }
}

/// Decode a stored message into its canonical shape
///
/// Well-formed payloads are filtered to text parts; a message left with
/// zero parts is omitted (`None`) so it never reaches reconstructed
/// history. Malformed payloads become a single text part carrying the raw
/// payload.
pub fn decode(stored: &StoredMessage) -> Option<CanonicalMessage> {
    let parts = match parse_payload(&stored.content) {
        ParsedPayload::Parts(parts) => {
            let text_parts: Vec<Part> = parts.into_iter().filter(Part::is_text).collect();
            if text_parts.is_empty() {
                return None;
            }
            text_parts
        }
        ParsedPayload::RawText(raw) => vec![Part::Text { text: raw }],
    };

    Some(CanonicalMessage {
        id: stored.id.clone(),
        role: stored.role,
        parts,
        created_at: stored.created_at,
    })
}

/// Serialize a part list into a stored payload
///
/// Every part given is written, including reasoning and unknown kinds.
pub fn encode_parts(parts: &[Part]) -> String {
    serde_json::to_string(parts).unwrap_or_else(|_| "[]".to_string())
}

/// Wrap plain text as a single-text-part payload
pub fn encode_text(text: &str) -> String {
    encode_parts(&[Part::text(text)])
}
