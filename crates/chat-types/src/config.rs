use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/chat";
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Client configuration. Every field has a default, so any partial JSON
/// object is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the chat API, e.g. `http://localhost:8000/api/chat`
    pub api_base: String,
    /// Initial send mode: streaming when true
    pub streaming: bool,
    /// Grace period between the terminal delta and placeholder removal
    pub settle_delay_ms: u64,
    /// Refresh from the backend even when the streamed reply is empty
    pub refresh_on_empty_reply: bool,
    /// Title sent when creating a session without one; `None` lets the
    /// backend choose
    pub default_session_title: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            streaming: false,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            refresh_on_empty_reply: false,
            default_session_title: None,
        }
    }
}

impl ClientConfig {
    /// Join a path onto `api_base`, tolerating a trailing slash on the base.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    pub fn sessions_url(&self) -> String {
        self.endpoint("sessions")
    }

    pub fn session_url(&self, session_id: &str) -> String {
        self.endpoint(&format!("sessions/{}", session_id))
    }

    pub fn session_messages_url(&self, session_id: &str) -> String {
        self.endpoint(&format!("sessions/{}/messages", session_id))
    }

    pub fn message_url(&self) -> String {
        self.endpoint("message")
    }

    pub fn stream_url(&self) -> String {
        self.endpoint("stream")
    }
}
