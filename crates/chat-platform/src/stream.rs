//! Streaming transport over `fetch()` and the response body's `ReadableStream`.
//!
//! The body bytes are handed to [`chat_core::sse::decode_stream`]. Dropping
//! the stream at any point cancels the reader, releases its lock and aborts
//! the request.

use std::pin::Pin;
use futures::stream::{self, Stream, StreamExt};
use gloo_net::http::Request;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, ReadableStreamDefaultReader};

use chat_core::ports::{TransportEvent, TransportPort, TransportStream};
use chat_core::sse::decode_stream;
use chat_types::{ChatError, Result, config::ClientConfig, delta::ChatRequest};
use crate::http::{body_error, ensure_ok, transport_error};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>>>>;

/// [`TransportPort`] that posts to the `/stream` endpoint.
pub struct FetchStreamTransport {
    config: ClientConfig,
}

impl FetchStreamTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl TransportPort for FetchStreamTransport {
    fn stream_message(&self, req: ChatRequest) -> TransportStream {
        let url = self.config.stream_url();
        // Nothing is sent until the first poll
        Box::pin(stream::once(open(url, req)).flatten())
    }
}

async fn open(url: String, req: ChatRequest) -> TransportStream {
    match connect(&url, &req).await {
        Ok(bytes) => Box::pin(decode_stream(bytes)),
        Err(e) => {
            log::error!("Failed to open stream {}: {}", url, e);
            Box::pin(stream::iter(vec![TransportEvent::Error(e)]))
        }
    }
}

async fn connect(url: &str, req: &ChatRequest) -> Result<ByteStream> {
    let abort = AbortOnDrop::new()?;
    let response = Request::post(url)
        .header("Accept", "text/event-stream")
        .abort_signal(Some(&abort.controller.signal()))
        .json(req)
        .map_err(body_error)?
        .send()
        .await
        .map_err(transport_error)?;
    let response = ensure_ok(response).await?;

    let body = response
        .body()
        .ok_or_else(|| ChatError::Transport("Stream response has no body".to_string()))?;
    let reader: ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|e| js_error(e.into()))?;
    log::debug!("Stream opened: {}", url);

    let reader = BodyReader { reader, _abort: abort };
    Ok(Box::pin(stream::unfold(reader, |reader| async move {
        let next = reader.read_chunk().await;
        match next {
            Ok(Some(chunk)) => Some((Ok(chunk), reader)),
            Ok(None) => None,
            Err(e) => Some((Err(e), reader)),
        }
    })))
}

// ─── Resource guards ─────────────────────────────────────────

/// Aborts the fetch when dropped, including while the request is in flight.
struct AbortOnDrop {
    controller: AbortController,
}

impl AbortOnDrop {
    fn new() -> Result<Self> {
        let controller = AbortController::new().map_err(js_error)?;
        Ok(Self { controller })
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.controller.abort();
    }
}

/// Holds the body lock for as long as the stream is alive.
struct BodyReader {
    reader: ReadableStreamDefaultReader,
    // Dropped after the reader lock is released
    _abort: AbortOnDrop,
}

impl BodyReader {
    async fn read_chunk(&self) -> Result<Option<Vec<u8>>> {
        let result = JsFuture::from(self.reader.read())
            .await
            .map_err(|e| ChatError::Transport(format!("Stream read failed: {:?}", e)))?;

        let done = Reflect::get(&result, &JsValue::from_str("done"))
            .map_err(js_error)?
            .as_bool()
            .unwrap_or(false);
        if done {
            return Ok(None);
        }

        let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_error)?;
        Ok(Some(Uint8Array::new(&value).to_vec()))
    }
}

impl Drop for BodyReader {
    fn drop(&mut self) {
        // Ignore the cancel promise; the lock must go regardless
        let _ = self.reader.cancel();
        let _ = self.reader.release_lock();
    }
}

fn js_error(e: JsValue) -> ChatError {
    ChatError::JsInterop(format!("{:?}", e))
}
