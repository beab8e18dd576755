use serde::{Deserialize, Serialize};
use crate::delta::ParseFault;
use crate::message::{Message, MessageId};

/// Reachability of the chat API as last probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiStatus {
    Checking,
    Connected,
    Unreachable,
}

/// Events emitted by the chat store.
/// UI layers subscribe to these instead of polling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// A message was appended to the transcript
    MessageAppended { message: Message },

    /// The streaming placeholder now holds `content`
    PlaceholderUpdated { id: MessageId, content: String },

    /// The streaming placeholder left the transcript
    PlaceholderRemoved { id: MessageId },

    /// The transcript was replaced wholesale (session load or refresh)
    TranscriptReplaced { messages: Vec<Message> },

    /// The "a reply is streaming in" flag flipped
    StreamingChanged { active: bool },

    /// The cached session list changed
    SessionsChanged { count: usize },

    /// The current session was switched or cleared
    CurrentSessionChanged { session_id: Option<String> },

    ApiStatusChanged { status: ApiStatus },

    /// A malformed stream frame was skipped
    FrameSkipped { fault: ParseFault },

    /// An operation failed
    Error { message: String },
}
