//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use chat_types::{
    ChatError, Result,
    delta::{ChatRequest, ChatResponse, ParseFault, StreamDelta},
    message::Message,
    session::{Session, SessionCreate, SessionUpdate},
};

// ─── Session backend ─────────────────────────────────────────

/// Plain request/response calls against the chat REST API.
#[async_trait(?Send)]
pub trait BackendPort {
    /// Sessions, most recently updated first
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    async fn create_session(&self, req: SessionCreate) -> Result<Session>;

    /// One session including its messages in chronological order
    async fn get_session(&self, session_id: &str) -> Result<Session>;

    async fn update_session(&self, session_id: &str, update: SessionUpdate) -> Result<Session>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Non-streaming send; the reply is persisted before this returns
    async fn send_message(&self, req: ChatRequest) -> Result<ChatResponse>;
}

// ─── Streaming transport ─────────────────────────────────────

/// One item produced by a streaming exchange.
///
/// `Error` is always the last item. `Done` marks the `[DONE]` sentinel; a
/// stream may also simply end when the connection closes.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Delta(StreamDelta),
    /// A frame that failed to decode and was skipped
    Skipped(ParseFault),
    Done,
    Error(ChatError),
}

pub type TransportStream = Pin<Box<dyn Stream<Item = TransportEvent>>>;

pub trait TransportPort {
    /// Open a streaming send. Nothing goes over the wire until the stream
    /// is first polled; dropping the stream closes the connection.
    fn stream_message(&self, req: ChatRequest) -> TransportStream;
}

// ─── Timer ───────────────────────────────────────────────────

#[async_trait(?Send)]
pub trait TimerPort {
    async fn sleep(&self, ms: u64);
}
