//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use chat_types::{
    Result,
    message::{Attachment, Message},
    session::{Feedback, SessionSummary},
};

use crate::cancel::AbortHandle;

// ─── Stream Transport Port ───────────────────────────────────

/// Raw response body, chunked however the network delivered it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>>>>;

/// Body of the request that opens a turn's response stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[async_trait(?Send)]
pub trait StreamTransport {
    /// Send the request and return the response body as a byte stream.
    ///
    /// A non-success status is an error. Implementations register a hook
    /// on `abort` that tears the connection down.
    async fn open(&self, request: &StreamRequest, abort: &AbortHandle) -> Result<ByteStream>;
}

// ─── Persistence Port ────────────────────────────────────────

/// Backend collaborators that own durable sessions and messages.
/// The core only reads their result shapes.
#[async_trait(?Send)]
pub trait PersistencePort {
    async fn create_session(&self, title: &str) -> Result<SessionSummary>;

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Persisted messages of a session, oldest first, all with durable ids
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Record a message the backend did not store on its own
    async fn log_message(&self, session_id: &str, message: &Message) -> Result<()>;

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()>;
}

// ─── Storage Port ────────────────────────────────────────────

/// Small string key-value store for client-side settings
#[async_trait(?Send)]
pub trait StoragePort {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
