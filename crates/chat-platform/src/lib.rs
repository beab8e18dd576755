//! Browser adapters for the chat-core ports.
//!
//! - [`http::HttpBackend`]: session and message REST calls
//! - [`stream::FetchStreamTransport`]: the `text/event-stream` send
//! - [`timer::GlooTimer`]: settle delay

pub mod http;
pub mod stream;
pub mod timer;

pub use http::HttpBackend;
pub use stream::FetchStreamTransport;
pub use timer::GlooTimer;
