//! REST adapter for the session and message endpoints.
//! Uses browser `fetch()` via gloo-net.

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;

use chat_core::ports::BackendPort;
use chat_types::{
    ChatError, Result,
    config::ClientConfig,
    delta::{ChatRequest, ChatResponse},
    message::Message,
    session::{Session, SessionCreate, SessionUpdate},
};

/// [`BackendPort`] over the chat API's JSON endpoints.
pub struct HttpBackend {
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait(?Send)]
impl BackendPort for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let response = Request::get(&self.config.sessions_url())
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn create_session(&self, req: SessionCreate) -> Result<Session> {
        let response = Request::post(&self.config.sessions_url())
            .json(&req)
            .map_err(body_error)?
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        let response = Request::get(&self.config.session_url(session_id))
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn update_session(&self, session_id: &str, update: SessionUpdate) -> Result<Session> {
        let response = Request::put(&self.config.session_url(session_id))
            .json(&update)
            .map_err(body_error)?
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let response = Request::delete(&self.config.session_url(session_id))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_ok(response).await.map(|_| ())
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let response = Request::get(&self.config.session_messages_url(session_id))
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn send_message(&self, req: ChatRequest) -> Result<ChatResponse> {
        let response = Request::post(&self.config.message_url())
            .json(&req)
            .map_err(body_error)?
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}

// ─── Response helpers ────────────────────────────────────────

/// Turn a non-2xx response into [`ChatError::Http`] carrying the body text.
pub(crate) async fn ensure_ok(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    log::warn!("{} returned HTTP {}", response.url(), status);
    Err(ChatError::Http { status, body })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_ok(response).await?;
    response
        .json()
        .await
        .map_err(|e| ChatError::Serialization(e.to_string()))
}

pub(crate) fn transport_error(e: gloo_net::Error) -> ChatError {
    ChatError::Transport(e.to_string())
}

pub(crate) fn body_error(e: gloo_net::Error) -> ChatError {
    ChatError::Serialization(e.to_string())
}
