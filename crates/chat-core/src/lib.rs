//! Core of the streaming chat client.
//!
//! Everything here is plain Rust: browser access goes through the traits in
//! [`ports`], implemented by `chat-platform`.

pub mod ports;
pub mod sse;
pub mod event_bus;
pub mod transcript;
pub mod cancel;
pub mod store;
pub mod reconciler;


pub use cancel::CancelToken;
pub use event_bus::EventBus;
pub use store::ChatStore;
