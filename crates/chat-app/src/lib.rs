//! Chat App: WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles the browser adapters into a [`chat_core::ChatStore`] and
//! exposes it to JavaScript as [`ChatClient`].

mod client;

use std::rc::Rc;
use wasm_bindgen::prelude::*;

use chat_core::{ChatStore, EventBus};
use chat_platform::{FetchStreamTransport, GlooTimer, HttpBackend};
use chat_types::config::ClientConfig;

pub use client::ChatClient;

/// WASM entry point, run once when the module is instantiated
#[wasm_bindgen(start)]
pub fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Chat client WASM starting...");
}

/// Build a store wired to the browser adapters.
pub fn connect(config: ClientConfig) -> ChatStore {
    log::info!("Connecting chat client to {}", config.api_base);
    ChatStore::new(
        config.clone(),
        Rc::new(HttpBackend::new(config.clone())),
        Rc::new(FetchStreamTransport::new(config.clone())),
        Rc::new(GlooTimer),
        EventBus::unbuffered(),
    )
}
