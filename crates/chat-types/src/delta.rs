//! Wire shapes for sending messages and for the streamed reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::message::Message;

/// One `data:` frame of a streamed reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
}

impl StreamDelta {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_final: false,
            tool_calls: None,
        }
    }

    pub fn terminal() -> Self {
        Self {
            content: String::new(),
            is_final: true,
            tool_calls: None,
        }
    }
}

/// What a caller asks the client to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    pub content: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SendRequest {
    pub fn new(content: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            content: content.into(),
            session_id,
        }
    }

    /// Build the body posted to `/message` or `/stream`.
    pub fn to_wire(&self, stream: bool) -> ChatRequest {
        ChatRequest {
            message: self.content.clone(),
            session_id: self.session_id.clone(),
            stream,
        }
    }
}

/// Body of `POST /message` and `POST /stream`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub stream: bool,
}

/// Response of the non-streaming `POST /message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: Message,
    #[serde(default = "default_complete")]
    pub is_complete: bool,
}

fn default_complete() -> bool {
    true
}

/// What a settled streaming send resolves with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    /// Malformed frames that were skipped during the exchange
    #[serde(default)]
    pub skipped_frames: usize,
}

/// A `data:` frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFault {
    pub payload: String,
    pub reason: String,
}

/// Result of `send_message`, which picks a mode from the client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SendOutcome {
    /// Non-streaming send: the persisted assistant message
    Complete { message: Message },
    /// Streaming send: the accumulated reply
    Streamed { reply: StreamReply },
}

impl SendOutcome {
    pub fn content(&self) -> &str {
        match self {
            SendOutcome::Complete { message } => &message.content,
            SendOutcome::Streamed { reply } => &reply.content,
        }
    }
}
