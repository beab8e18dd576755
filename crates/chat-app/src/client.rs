//! JavaScript-facing chat client.
//!
//! Async operations return a `Promise` that resolves with the JSON form of
//! the result, or rejects with an `Error` carrying the [`ChatError`] text.

use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Function, Promise};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use chat_core::ChatStore;
use chat_core::event_bus::SubscriptionId;
use chat_types::{ChatError, config::ClientConfig, delta::SendRequest, event::ChatEvent};

#[wasm_bindgen]
pub struct ChatClient {
    store: ChatStore,
}

#[wasm_bindgen]
impl ChatClient {
    /// `config` is a partial [`ClientConfig`] object; `undefined` takes
    /// every default.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ChatClient, JsValue> {
        let config = parse_config(&config).map_err(to_js_error)?;
        Ok(Self {
            store: crate::connect(config),
        })
    }

    // ─── Sessions ────────────────────────────────────────────

    #[wasm_bindgen(js_name = loadSessions)]
    pub fn load_sessions(&self) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move { respond(store.load_sessions().await) })
    }

    #[wasm_bindgen(js_name = createSession)]
    pub fn create_session(&self, title: Option<String>) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move { respond(store.create_session(title).await) })
    }

    /// Load a session with its messages and make it current.
    #[wasm_bindgen(js_name = openSession)]
    pub fn open_session(&self, session_id: String) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move { respond(store.load_session_detail(&session_id).await) })
    }

    #[wasm_bindgen(js_name = renameSession)]
    pub fn rename_session(&self, session_id: String, title: String) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move {
            respond(store.update_session_title(&session_id, &title).await)
        })
    }

    #[wasm_bindgen(js_name = deleteSession)]
    pub fn delete_session(&self, session_id: String) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move { respond(store.delete_session(&session_id).await) })
    }

    #[wasm_bindgen(js_name = getMessages)]
    pub fn get_messages(&self, session_id: String) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move { respond(store.get_messages(&session_id).await) })
    }

    #[wasm_bindgen(js_name = clearCurrentSession)]
    pub fn clear_current_session(&self) -> Result<(), JsValue> {
        self.store.clear_current_session().map_err(to_js_error)
    }

    // ─── Sending ─────────────────────────────────────────────

    /// Send in the currently selected mode.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, content: String, session_id: Option<String>) -> Promise {
        let store = self.store.clone();
        let request = SendRequest::new(content, session_id);
        future_to_promise(async move { respond(store.send_message(request).await) })
    }

    #[wasm_bindgen(js_name = sendStreaming)]
    pub fn send_streaming(&self, content: String, session_id: Option<String>) -> Promise {
        let store = self.store.clone();
        let request = SendRequest::new(content, session_id);
        future_to_promise(async move { respond(store.send_streaming(request).await) })
    }

    #[wasm_bindgen(js_name = cancelStream)]
    pub fn cancel_stream(&self) -> bool {
        self.store.cancel_stream()
    }

    #[wasm_bindgen(js_name = toggleStreaming)]
    pub fn toggle_streaming(&self) -> bool {
        self.store.toggle_streaming()
    }

    #[wasm_bindgen(js_name = checkApiStatus)]
    pub fn check_api_status(&self) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move { Ok(JsValue::from_bool(store.check_api_status().await)) })
    }

    // ─── State ───────────────────────────────────────────────

    pub fn transcript(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.transcript())
    }

    pub fn sessions(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.sessions())
    }

    #[wasm_bindgen(js_name = currentSessionId)]
    pub fn current_session_id(&self) -> Option<String> {
        self.store.current_session_id()
    }

    #[wasm_bindgen(js_name = isStreaming)]
    pub fn is_streaming(&self) -> bool {
        self.store.is_streaming()
    }

    #[wasm_bindgen(js_name = isStreamingEnabled)]
    pub fn is_streaming_enabled(&self) -> bool {
        self.store.is_streaming_enabled()
    }

    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    #[wasm_bindgen(js_name = apiStatus)]
    pub fn api_status(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.api_status())
    }

    // ─── Events ──────────────────────────────────────────────

    /// Call `callback` with every store event. Returns a handle for
    /// [`ChatClient::unsubscribe`].
    pub fn subscribe(&self, callback: Function) -> f64 {
        let id = self.store.event_bus().subscribe(move |event: &ChatEvent| {
            let value = match JsValue::from_serde(event) {
                Ok(value) => value,
                Err(e) => {
                    log::error!("Failed to serialize event: {}", e);
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                log::error!("Event subscriber threw: {:?}", e);
            }
        });
        id.0 as f64
    }

    pub fn unsubscribe(&self, handle: f64) -> bool {
        self.store.event_bus().unsubscribe(SubscriptionId(handle as u64))
    }
}

// ─── Conversions ─────────────────────────────────────────────

fn parse_config(value: &JsValue) -> chat_types::Result<ClientConfig> {
    if value.is_undefined() || value.is_null() {
        return Ok(ClientConfig::default());
    }
    value
        .into_serde()
        .map_err(|e| ChatError::Config(format!("invalid client config: {}", e)))
}

fn respond<T: Serialize>(result: chat_types::Result<T>) -> Result<JsValue, JsValue> {
    match result {
        Ok(value) => to_js(&value),
        Err(e) => Err(to_js_error(e)),
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|e| to_js_error(ChatError::from(e)))
}

fn to_js_error(e: ChatError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}
