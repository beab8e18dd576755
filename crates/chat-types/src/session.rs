use serde::{Deserialize, Serialize};
use crate::message::Message;

/// A conversation session as cached from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    /// Overlay the fields the backend returns from an update onto a cached
    /// entry. Messages are only replaced when the update carries some.
    pub fn merge(&mut self, updated: Session) {
        self.title = updated.title;
        self.created_at = updated.created_at;
        self.updated_at = updated.updated_at;
        if !updated.messages.is_empty() {
            self.messages = updated.messages;
        }
    }
}

/// Body of `POST /sessions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Body of `PUT /sessions/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SessionUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}
