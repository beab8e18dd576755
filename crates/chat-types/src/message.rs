use std::fmt;

use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Stored by the backend but never produced by this client
    System,
    /// Stored by the backend but never produced by this client
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// Client-side identifier for a message that has not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local#{}", self.0)
    }
}

/// Identity of a transcript entry.
///
/// Server ids arrive as plain JSON strings and always decode as `Persisted`.
/// Placeholders encode as `{"local": n}` so the two can never be confused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Persisted(String),
    Placeholder {
        local: LocalId,
    },
}

impl MessageId {
    pub fn placeholder(local: LocalId) -> Self {
        MessageId::Placeholder { local }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, MessageId::Placeholder { .. })
    }

    pub fn as_persisted(&self) -> Option<&str> {
        match self {
            MessageId::Persisted(id) => Some(id),
            MessageId::Placeholder { .. } => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Persisted(id) => f.write_str(id),
            MessageId::Placeholder { local } => local.fmt(f),
        }
    }
}

/// A single message in a session transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: Option<String>,
    pub role: Role,
    pub content: String,
    /// Opaque serialized tool-call payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<String>,
    /// Opaque serialized tool-result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<String>,
    pub created_at: String,
}

impl Message {
    /// A locally stamped message that exists only until the transcript is
    /// refreshed from the backend.
    pub fn local(
        local: LocalId,
        session_id: Option<String>,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::placeholder(local),
            session_id,
            role,
            content: content.into(),
            tool_calls: None,
            tool_results: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_placeholder()
    }
}
