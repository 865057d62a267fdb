use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Role of a message sender within a thread
///
/// `System` is reserved for internally generated messages and is never
/// creatable through any exposed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Storage representation ("USER", "ASSISTANT", "SYSTEM")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
            Self::System => "SYSTEM",
        }
    }

    /// Lowercase role name used on the model-provider wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Parse the storage representation back into a role
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "ASSISTANT" => Some(Self::Assistant),
            "SYSTEM" => Some(Self::System),
            _ => None,
        }
    }
}

/// Kind of a persisted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Normal,
    Error,
}

impl MessageKind {
    /// Storage representation ("NORMAL", "ERROR")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Error => "ERROR",
        }
    }

    /// Parse the storage representation back into a kind
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(Self::Normal),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A persisted message, immutable once written
///
/// `content` is the raw stored payload: either a JSON array of typed parts
/// or plain text (the codec normalizes both on read).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Unique identifier (ULID, sortable by creation time)
    pub id: String,
    /// Owning thread
    pub thread_id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message kind
    pub kind: MessageKind,
    /// Model that produced or received this message (None for user turns
    /// sent without an explicit model)
    pub model: Option<String>,
    /// Stored content payload
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Create a new message record with a fresh ULID and current timestamp
    pub fn new(
        thread_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            thread_id: thread_id.into(),
            role,
            kind: MessageKind::Normal,
            model,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a new USER message record
    pub fn user(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self::new(thread_id, MessageRole::User, content, model)
    }

    /// Create a new ASSISTANT message record
    pub fn assistant(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self::new(thread_id, MessageRole::Assistant, content, model)
    }
}

/// A persisted conversation thread with its ordered messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Title derived from the first message
    pub title: String,
    /// Model associated with the thread
    pub model: Option<String>,
    /// Owning user identity (opaque)
    pub user_id: String,
    /// Messages in creation order
    pub messages: Vec<StoredMessage>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
