//! WASM-target tests for chat-core.
//!
//! Runs the SSE decoder, EventBus and the streaming send against mock ports
//! under wasm32-unknown-unknown via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use chat_core::event_bus::EventBus;
use chat_core::ports::*;
use chat_core::sse::{SseDecoder, SseFrame, decode_stream};
use chat_core::store::ChatStore;
use chat_types::ChatError;
use chat_types::config::ClientConfig;
use chat_types::delta::*;
use chat_types::event::ChatEvent;
use chat_types::message::*;
use chat_types::session::*;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

// ─── SSE Tests ───────────────────────────────────────────

#[wasm_bindgen_test]
fn decoder_joins_chunks() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: {\"content\":").is_empty());
    let frames = decoder.push(b"\"ok\"}\ndata: [DONE]\n");
    assert_eq!(
        frames,
        vec![SseFrame::Delta(StreamDelta::text("ok")), SseFrame::Done]
    );
}

#[wasm_bindgen_test]
async fn decode_stream_yields_events() {
    let source = stream::iter(vec![
        Ok(b"data: {\"content\":\"a\"}\n\ndata: {bad}\n".to_vec()),
        Ok(b"data: {\"content\":\"\",\"is_final\":true}\n".to_vec()),
    ]);
    let events: Vec<TransportEvent> = decode_stream(source).collect().await;
    assert_eq!(events.len(), 3);
    assert!(matches!(events[1], TransportEvent::Skipped(_)));
    assert!(matches!(&events[2], TransportEvent::Delta(d) if d.is_final));
}

// ─── EventBus Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn event_bus_emit_and_drain() {
    let bus = EventBus::new();
    bus.emit(ChatEvent::StreamingChanged { active: true });
    assert!(bus.has_pending());
    assert_eq!(bus.drain().len(), 1);
    assert!(!bus.has_pending());
}

#[wasm_bindgen_test]
fn event_bus_subscriber_notified() {
    let bus = EventBus::unbuffered();
    let seen = Rc::new(Cell::new(0));
    let counter = seen.clone();
    bus.subscribe(move |_| counter.set(counter.get() + 1));
    bus.emit(ChatEvent::SessionsChanged { count: 0 });
    assert_eq!(seen.get(), 1);
}

// ─── Mock ports ──────────────────────────────────────────

struct MockBackend {
    detail_calls: Cell<usize>,
}

#[async_trait(?Send)]
impl BackendPort for MockBackend {
    async fn list_sessions(&self) -> chat_types::Result<Vec<Session>> {
        Ok(vec![])
    }

    async fn create_session(&self, _req: SessionCreate) -> chat_types::Result<Session> {
        Err(ChatError::Other("not scripted".to_string()))
    }

    async fn get_session(&self, session_id: &str) -> chat_types::Result<Session> {
        self.detail_calls.set(self.detail_calls.get() + 1);
        Ok(Session {
            id: session_id.to_string(),
            title: "Chat".to_string(),
            created_at: "2024-05-01T12:00:00Z".to_string(),
            updated_at: "2024-05-01T12:00:00Z".to_string(),
            messages: vec![Message {
                id: MessageId::Persisted("m1".to_string()),
                session_id: Some(session_id.to_string()),
                role: Role::Assistant,
                content: "Hello".to_string(),
                tool_calls: None,
                tool_results: None,
                created_at: "2024-05-01T12:00:00Z".to_string(),
            }],
        })
    }

    async fn update_session(&self, _id: &str, _update: SessionUpdate) -> chat_types::Result<Session> {
        Err(ChatError::Other("not scripted".to_string()))
    }

    async fn delete_session(&self, _id: &str) -> chat_types::Result<()> {
        Ok(())
    }

    async fn get_messages(&self, _id: &str) -> chat_types::Result<Vec<Message>> {
        Ok(vec![])
    }

    async fn send_message(&self, _req: ChatRequest) -> chat_types::Result<ChatResponse> {
        Err(ChatError::Other("not scripted".to_string()))
    }
}

struct MockTransport {
    events: RefCell<Option<Vec<TransportEvent>>>,
}

impl TransportPort for MockTransport {
    fn stream_message(&self, _req: ChatRequest) -> TransportStream {
        let events = self.events.borrow_mut().take().unwrap_or_default();
        Box::pin(stream::iter(events))
    }
}

struct NoopTimer;

#[async_trait(?Send)]
impl TimerPort for NoopTimer {
    async fn sleep(&self, _ms: u64) {}
}

fn store_with(events: Vec<TransportEvent>) -> (ChatStore, Rc<MockBackend>) {
    let backend = Rc::new(MockBackend {
        detail_calls: Cell::new(0),
    });
    let transport = Rc::new(MockTransport {
        events: RefCell::new(Some(events)),
    });
    let store = ChatStore::new(
        ClientConfig::default(),
        backend.clone(),
        transport,
        Rc::new(NoopTimer),
        EventBus::new(),
    );
    (store, backend)
}

// ─── Streaming Send Tests ────────────────────────────────

#[wasm_bindgen_test]
async fn streaming_send_settles_and_refreshes() {
    let (store, backend) = store_with(vec![
        TransportEvent::Delta(StreamDelta::text("Hel")),
        TransportEvent::Delta(StreamDelta::text("lo")),
        TransportEvent::Delta(StreamDelta::terminal()),
    ]);

    let reply = store
        .send_streaming(SendRequest::new("Hi", Some("s1".to_string())))
        .await
        .unwrap();

    assert_eq!(reply.content, "Hello");
    assert_eq!(backend.detail_calls.get(), 1);
    assert!(!store.is_streaming());
    let transcript = store.transcript();
    assert_eq!(transcript.len(), 1);
    assert!(!transcript[0].is_placeholder());
}

#[wasm_bindgen_test]
async fn streaming_send_error_rolls_back() {
    let (store, backend) = store_with(vec![
        TransportEvent::Delta(StreamDelta::text("par")),
        TransportEvent::Error(ChatError::Transport("reset".to_string())),
    ]);

    let result = store
        .send_streaming(SendRequest::new("Hi", Some("s1".to_string())))
        .await;

    assert!(matches!(result, Err(ChatError::Transport(_))));
    assert_eq!(backend.detail_calls.get(), 0);
    let transcript = store.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, Role::User);
}
