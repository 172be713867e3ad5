//! Browser adapters for the chat-core ports.
//!
//! - [`transport`]: streaming `fetch()` with abort support
//! - [`api`]: REST persistence collaborators
//! - [`storage`]: key-value stores for the saved context

pub mod transport;
pub mod api;
pub mod storage;

pub use api::RestPersistence;
pub use transport::FetchStreamTransport;
