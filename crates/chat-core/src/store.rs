//! Chat store: the explicit context object owning all client state.
//!
//! State lives behind one `Rc<RefCell<_>>`. A borrow is never held across an
//! `.await` or while the bus notifies subscribers, so subscribers may read
//! the store from inside their callback.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chat_types::{
    Result,
    config::ClientConfig,
    delta::{SendOutcome, SendRequest},
    event::{ApiStatus, ChatEvent},
    message::{LocalId, Message, Role},
    session::{Session, SessionCreate, SessionUpdate},
};
use crate::cancel::CancelToken;
use crate::event_bus::EventBus;
use crate::ports::{BackendPort, TimerPort, TransportPort};
use crate::transcript::Transcript;

/// Everything the client knows, mutated only through [`ChatStore`].
pub struct ChatState {
    pub sessions: Vec<Session>,
    pub current_session: Option<Session>,
    pub transcript: Transcript,
    /// A reply is streaming in
    pub is_streaming: bool,
    /// Send mode: streaming when true
    pub streaming_enabled: bool,
    pub loading: bool,
    pub api_status: ApiStatus,
    /// A streaming send has started and not yet settled. Outlives
    /// `is_streaming`, which drops before the settle delay.
    pub(crate) stream_slot_taken: bool,
    pub(crate) active_cancel: Option<CancelToken>,
    next_local_id: u64,
}

impl ChatState {
    fn new(streaming_enabled: bool) -> Self {
        Self {
            sessions: Vec::new(),
            current_session: None,
            transcript: Transcript::new(),
            is_streaming: false,
            streaming_enabled,
            loading: false,
            api_status: ApiStatus::Checking,
            stream_slot_taken: false,
            active_cancel: None,
            next_local_id: 1,
        }
    }

    /// Stamp a client-only message with a fresh local id.
    pub(crate) fn local_message(
        &mut self,
        session_id: Option<String>,
        role: Role,
        content: &str,
    ) -> Message {
        let local = LocalId(self.next_local_id);
        self.next_local_id += 1;
        Message::local(local, session_id, role, content)
    }
}

/// Handle to the chat client state and its ports. Clones share state.
#[derive(Clone)]
pub struct ChatStore {
    pub(crate) config: Rc<ClientConfig>,
    pub(crate) state: Rc<RefCell<ChatState>>,
    pub(crate) backend: Rc<dyn BackendPort>,
    pub(crate) transport: Rc<dyn TransportPort>,
    pub(crate) timer: Rc<dyn TimerPort>,
    pub(crate) bus: EventBus,
}

impl ChatStore {
    pub fn new(
        config: ClientConfig,
        backend: Rc<dyn BackendPort>,
        transport: Rc<dyn TransportPort>,
        timer: Rc<dyn TimerPort>,
        bus: EventBus,
    ) -> Self {
        let state = ChatState::new(config.streaming);
        Self {
            config: Rc::new(config),
            state: Rc::new(RefCell::new(state)),
            backend,
            transport,
            timer,
            bus,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    // ─── Read access ─────────────────────────────────────────

    /// Borrow the whole state. Do not hold the guard across an `.await`.
    pub fn state(&self) -> Ref<'_, ChatState> {
        self.state.borrow()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.state.borrow().sessions.clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().current_session.clone()
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.state.borrow().current_session.as_ref().map(|s| s.id.clone())
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.state.borrow().transcript.messages().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.state.borrow().transcript.len()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming
    }

    pub fn is_streaming_enabled(&self) -> bool {
        self.state.borrow().streaming_enabled
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn api_status(&self) -> ApiStatus {
        self.state.borrow().api_status
    }

    // ─── Sessions ────────────────────────────────────────────

    pub async fn load_sessions(&self) -> Result<Vec<Session>> {
        self.set_loading(true);
        let result = self.backend.list_sessions().await;
        self.set_loading(false);

        let sessions = result.map_err(|e| self.report("Failed to load sessions", e))?;
        let count = sessions.len();
        self.state.borrow_mut().sessions = sessions.clone();
        self.bus.emit(ChatEvent::SessionsChanged { count });
        Ok(sessions)
    }

    /// Create a session and put it at the front of the cached list.
    pub async fn create_session(&self, title: Option<String>) -> Result<Session> {
        let title = title.or_else(|| self.config.default_session_title.clone());
        let session = self
            .backend
            .create_session(SessionCreate { title })
            .await
            .map_err(|e| self.report("Failed to create session", e))?;

        let count = {
            let mut state = self.state.borrow_mut();
            state.sessions.insert(0, session.clone());
            state.sessions.len()
        };
        log::info!("Created session {}", session.id);
        self.bus.emit(ChatEvent::SessionsChanged { count });
        Ok(session)
    }

    /// Fetch a session with its messages and make it current. Its messages
    /// replace the transcript wholesale.
    pub async fn load_session_detail(&self, session_id: &str) -> Result<Session> {
        self.ensure_idle("load session")?;
        self.refresh_session(session_id).await
    }

    /// Unguarded body of [`ChatStore::load_session_detail`], also used to
    /// settle a streamed reply while the stream slot is still held.
    pub(crate) async fn refresh_session(&self, session_id: &str) -> Result<Session> {
        self.set_loading(true);
        let result = self.backend.get_session(session_id).await;
        self.set_loading(false);

        let session = result.map_err(|e| self.report("Failed to load session", e))?;
        let messages = session.messages.clone();
        {
            let mut state = self.state.borrow_mut();
            state.transcript.replace(messages.clone());
            state.current_session = Some(session.clone());
        }
        self.bus.emit(ChatEvent::CurrentSessionChanged {
            session_id: Some(session.id.clone()),
        });
        self.bus.emit(ChatEvent::TranscriptReplaced { messages });
        Ok(session)
    }

    pub async fn update_session_title(&self, session_id: &str, title: &str) -> Result<Session> {
        let updated = self
            .backend
            .update_session(session_id, SessionUpdate::title(title))
            .await
            .map_err(|e| self.report("Failed to update session title", e))?;

        let (count, current_changed) = {
            let mut state = self.state.borrow_mut();
            if let Some(cached) = state.sessions.iter_mut().find(|s| s.id == session_id) {
                cached.merge(updated.clone());
            }
            let current_changed = match state.current_session.as_mut() {
                Some(current) if current.id == session_id => {
                    current.merge(updated.clone());
                    true
                }
                _ => false,
            };
            (state.sessions.len(), current_changed)
        };
        self.bus.emit(ChatEvent::SessionsChanged { count });
        if current_changed {
            self.bus.emit(ChatEvent::CurrentSessionChanged {
                session_id: Some(session_id.to_string()),
            });
        }
        Ok(updated)
    }

    /// Delete a session. Clears the current session and transcript if it
    /// was the one deleted.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.ensure_idle("delete session")?;
        self.backend
            .delete_session(session_id)
            .await
            .map_err(|e| self.report("Failed to delete session", e))?;

        let (count, was_current) = {
            let mut state = self.state.borrow_mut();
            state.sessions.retain(|s| s.id != session_id);
            let was_current = state
                .current_session
                .as_ref()
                .is_some_and(|s| s.id == session_id);
            if was_current {
                state.current_session = None;
                state.transcript.clear();
            }
            (state.sessions.len(), was_current)
        };
        log::info!("Deleted session {}", session_id);
        self.bus.emit(ChatEvent::SessionsChanged { count });
        if was_current {
            self.bus.emit(ChatEvent::CurrentSessionChanged { session_id: None });
            self.bus.emit(ChatEvent::TranscriptReplaced { messages: Vec::new() });
        }
        Ok(())
    }

    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        self.backend
            .get_messages(session_id)
            .await
            .map_err(|e| self.report("Failed to load messages", e))
    }

    pub fn set_current_session(&self, session: Option<Session>) {
        let session_id = session.as_ref().map(|s| s.id.clone());
        self.state.borrow_mut().current_session = session;
        self.bus.emit(ChatEvent::CurrentSessionChanged { session_id });
    }

    pub fn clear_current_session(&self) -> Result<()> {
        self.ensure_idle("clear session")?;
        {
            let mut state = self.state.borrow_mut();
            state.current_session = None;
            state.transcript.clear();
        }
        self.bus.emit(ChatEvent::CurrentSessionChanged { session_id: None });
        self.bus.emit(ChatEvent::TranscriptReplaced { messages: Vec::new() });
        Ok(())
    }

    // ─── Sending ─────────────────────────────────────────────

    /// Send using whichever mode is currently selected.
    pub async fn send_message(&self, request: SendRequest) -> Result<SendOutcome> {
        if self.is_streaming_enabled() {
            let reply = self.send_streaming(request).await?;
            Ok(SendOutcome::Streamed { reply })
        } else {
            let message = self.send_normal_message(request).await?;
            Ok(SendOutcome::Complete { message })
        }
    }

    /// Non-streaming send. The user message is echoed locally, the persisted
    /// reply appended, and the session list reloaded for its new ordering.
    pub async fn send_normal_message(&self, request: SendRequest) -> Result<Message> {
        self.ensure_idle("send message")?;
        let echo = self
            .state
            .borrow_mut()
            .local_message(request.session_id.clone(), Role::User, &request.content);
        self.append(echo.clone());

        let response = match self.backend.send_message(request.to_wire(false)).await {
            Ok(response) => response,
            Err(e) => {
                self.state.borrow_mut().transcript.remove(&echo.id);
                self.bus.emit(ChatEvent::TranscriptReplaced { messages: self.transcript() });
                return Err(self.report("Failed to send message", e));
            }
        };

        let message = response.message;
        self.append(message.clone());
        self.load_sessions().await?;
        Ok(message)
    }

    /// Flip the send mode. Returns the new mode.
    pub fn toggle_streaming(&self) -> bool {
        let mut state = self.state.borrow_mut();
        state.streaming_enabled = !state.streaming_enabled;
        state.streaming_enabled
    }

    /// Abort the active streaming send, if any.
    pub fn cancel_stream(&self) -> bool {
        let token = self.state.borrow().active_cancel.clone();
        match token {
            Some(token) => {
                log::info!("Cancelling active stream");
                token.cancel();
                true
            }
            None => false,
        }
    }

    // ─── Status ──────────────────────────────────────────────

    /// Probe the API by listing sessions.
    pub async fn check_api_status(&self) -> bool {
        let status = match self.backend.list_sessions().await {
            Ok(_) => ApiStatus::Connected,
            Err(e) => {
                log::error!("API unreachable: {}", e);
                ApiStatus::Unreachable
            }
        };
        self.state.borrow_mut().api_status = status;
        self.bus.emit(ChatEvent::ApiStatusChanged { status });
        status == ApiStatus::Connected
    }

    // ─── Helpers ─────────────────────────────────────────────

    pub(crate) fn append(&self, message: Message) {
        self.state.borrow_mut().transcript.push(message.clone());
        self.bus.emit(ChatEvent::MessageAppended { message });
    }

    /// The transcript belongs to the reconciler until a streamed reply
    /// settles; operations that rewrite it are refused meanwhile.
    fn ensure_idle(&self, operation: &str) -> Result<()> {
        if self.state.borrow().stream_slot_taken {
            log::warn!("Rejected {}: a streaming reply is in progress", operation);
            return Err(chat_types::ChatError::StreamInProgress);
        }
        Ok(())
    }

    fn set_loading(&self, loading: bool) {
        self.state.borrow_mut().loading = loading;
    }

    /// Log and publish a failure, handing the error back for propagation.
    pub(crate) fn report(&self, context: &str, err: chat_types::ChatError) -> chat_types::ChatError {
        log::error!("{}: {}", context, err);
        self.bus.emit(ChatEvent::Error {
            message: format!("{}: {}", context, err),
        });
        err
    }
}
