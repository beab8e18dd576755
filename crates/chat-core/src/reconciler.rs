//! Stream reconciler: merges a streamed reply into the transcript.
//!
//! Lifecycle of one streaming send:
//! 1. Start: echo the user message and append an empty assistant placeholder
//! 2. Accumulate: every non-empty delta is appended, and the placeholder
//!    shows the whole accumulated text
//! 3. Settle: on the final delta (or the end of the stream) the streaming
//!    flag drops, and after the settle delay the placeholder is removed and
//!    the transcript refreshed from the backend if anything was received
//! 4. Abandon: on a transport error or cancellation the placeholder is
//!    removed and the error returned; no refresh happens

use futures::StreamExt;
use futures::future::Abortable;
use serde_json::Value;

use chat_types::{
    ChatError, Result,
    delta::{SendRequest, StreamDelta, StreamReply},
    event::ChatEvent,
    message::{Message, MessageId, Role},
};
use crate::cancel::CancelToken;
use crate::ports::TransportEvent;
use crate::store::ChatStore;
use crate::transcript::Transcript;

/// What applying one delta did to the placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// Placeholder content changed
    pub grew: bool,
    /// The delta was the final one
    pub is_final: bool,
}

/// Bookkeeping for the assistant reply under construction.
#[derive(Debug)]
pub struct PendingReply {
    placeholder: MessageId,
    accumulated: String,
    tool_calls: Option<Vec<Value>>,
    skipped_frames: usize,
}

impl PendingReply {
    /// Append the user echo and the empty placeholder, in that order.
    pub fn start(transcript: &mut Transcript, user: Message, placeholder: Message) -> Self {
        let id = placeholder.id.clone();
        transcript.push(user);
        transcript.push(placeholder);
        Self {
            placeholder: id,
            accumulated: String::new(),
            tool_calls: None,
            skipped_frames: 0,
        }
    }

    pub fn placeholder_id(&self) -> &MessageId {
        &self.placeholder
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Append the delta's content in arrival order. Content on the final
    /// delta is kept too. `grew` is false when the placeholder has left the
    /// transcript; the text still accumulates into the reply.
    pub fn apply(&mut self, transcript: &mut Transcript, delta: StreamDelta) -> Applied {
        let mut grew = false;
        if !delta.content.is_empty() {
            self.accumulated.push_str(&delta.content);
            grew = transcript.set_content(&self.placeholder, &self.accumulated);
            if !grew {
                log::warn!("Placeholder {} is gone; delta not shown", self.placeholder);
            }
        }
        if delta.is_final {
            self.tool_calls = delta.tool_calls;
        }
        Applied {
            grew,
            is_final: delta.is_final,
        }
    }

    pub fn record_skip(&mut self) {
        self.skipped_frames += 1;
    }

    /// Whether settlement should reload the session from the backend.
    pub fn needs_refresh(&self, refresh_on_empty: bool) -> bool {
        refresh_on_empty || !self.accumulated.trim().is_empty()
    }

    /// Take the placeholder out of the transcript. False if it was already gone.
    pub fn withdraw(&self, transcript: &mut Transcript) -> bool {
        transcript.remove(&self.placeholder).is_some()
    }

    pub fn into_reply(self) -> StreamReply {
        StreamReply {
            content: self.accumulated,
            tool_calls: self.tool_calls,
            skipped_frames: self.skipped_frames,
        }
    }
}

impl ChatStore {
    /// Streaming send with a fresh cancellation token, reachable through
    /// [`ChatStore::cancel_stream`].
    pub async fn send_streaming(&self, request: SendRequest) -> Result<StreamReply> {
        self.send_streaming_with(request, CancelToken::new()).await
    }

    /// Streaming send that `cancel` can abort at any point before settlement.
    ///
    /// Rejected with [`ChatError::StreamInProgress`] while another streaming
    /// send has not settled yet.
    pub async fn send_streaming_with(
        &self,
        request: SendRequest,
        cancel: CancelToken,
    ) -> Result<StreamReply> {
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        let (mut pending, user, placeholder, registration) = {
            let mut state = self.state.borrow_mut();
            if state.stream_slot_taken {
                log::warn!("Rejected streaming send: another reply is still streaming");
                return Err(ChatError::StreamInProgress);
            }
            let registration = cancel.take_registration()?;
            let session_id = request.session_id.clone();
            let user = state.local_message(session_id.clone(), Role::User, &request.content);
            let placeholder = state.local_message(session_id, Role::Assistant, "");
            state.stream_slot_taken = true;
            state.is_streaming = true;
            state.active_cancel = Some(cancel.clone());
            let pending =
                PendingReply::start(&mut state.transcript, user.clone(), placeholder.clone());
            (pending, user, placeholder, registration)
        };
        log::info!("Streaming reply started ({})", pending.placeholder_id());
        self.bus.emit(ChatEvent::MessageAppended { message: user });
        self.bus.emit(ChatEvent::MessageAppended { message: placeholder });
        self.bus.emit(ChatEvent::StreamingChanged { active: true });

        let stream = Abortable::new(
            self.transport.stream_message(request.to_wire(true)),
            registration,
        );
        let consumed = self.consume(&mut pending, stream, &cancel).await;

        match consumed {
            Ok(()) => self.settle(pending, &request).await,
            Err(e) => Err(self.abandon(&pending, e)),
        }
    }

    /// Feed transport events into the placeholder until the reply is
    /// complete. The stream is dropped on return.
    async fn consume<S>(
        &self,
        pending: &mut PendingReply,
        mut stream: S,
        cancel: &CancelToken,
    ) -> Result<()>
    where
        S: futures::Stream<Item = TransportEvent> + Unpin,
    {
        while let Some(event) = stream.next().await {
            match event {
                TransportEvent::Delta(delta) => {
                    let applied = {
                        let mut state = self.state.borrow_mut();
                        pending.apply(&mut state.transcript, delta)
                    };
                    if applied.grew {
                        self.bus.emit(ChatEvent::PlaceholderUpdated {
                            id: pending.placeholder_id().clone(),
                            content: pending.accumulated().to_string(),
                        });
                    }
                    if applied.is_final {
                        return Ok(());
                    }
                }
                TransportEvent::Skipped(fault) => {
                    pending.record_skip();
                    self.bus.emit(ChatEvent::FrameSkipped { fault });
                }
                TransportEvent::Done => {
                    log::debug!("Sentinel arrived before a final delta");
                    return Ok(());
                }
                TransportEvent::Error(e) => return Err(e),
            }
        }

        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }
        log::debug!("Stream closed without a terminal frame; settling");
        Ok(())
    }

    async fn settle(&self, pending: PendingReply, request: &SendRequest) -> Result<StreamReply> {
        {
            let mut state = self.state.borrow_mut();
            state.is_streaming = false;
            state.active_cancel = None;
        }
        self.bus.emit(ChatEvent::StreamingChanged { active: false });

        let delay = self.config.settle_delay_ms;
        if delay > 0 {
            self.timer.sleep(delay).await;
        }

        let removed = {
            let mut state = self.state.borrow_mut();
            pending.withdraw(&mut state.transcript)
        };
        if removed {
            self.bus.emit(ChatEvent::PlaceholderRemoved {
                id: pending.placeholder_id().clone(),
            });
        }

        let refreshed = if pending.needs_refresh(self.config.refresh_on_empty_reply) {
            match request.session_id.as_deref() {
                Some(session_id) => self.refresh_session(session_id).await.map(|_| ()),
                None => {
                    log::warn!("Streamed reply has no session id; skipping refresh");
                    Ok(())
                }
            }
        } else {
            log::debug!("Empty streamed reply; skipping refresh");
            Ok(())
        };

        self.state.borrow_mut().stream_slot_taken = false;
        refreshed?;

        let reply = pending.into_reply();
        log::info!(
            "Streaming reply settled ({} chars, {} skipped frames)",
            reply.content.len(),
            reply.skipped_frames
        );
        Ok(reply)
    }

    /// Roll back the placeholder after a failed or cancelled stream.
    fn abandon(&self, pending: &PendingReply, err: ChatError) -> ChatError {
        let removed = {
            let mut state = self.state.borrow_mut();
            state.is_streaming = false;
            state.stream_slot_taken = false;
            state.active_cancel = None;
            pending.withdraw(&mut state.transcript)
        };
        self.bus.emit(ChatEvent::StreamingChanged { active: false });
        if removed {
            self.bus.emit(ChatEvent::PlaceholderRemoved {
                id: pending.placeholder_id().clone(),
            });
        }

        if err == ChatError::Cancelled {
            log::info!("Streaming reply cancelled");
            err
        } else {
            self.report("Streaming reply failed", err)
        }
    }
}
