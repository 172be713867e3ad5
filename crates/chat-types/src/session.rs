use serde::{Deserialize, Serialize};
use crate::message::{FeedbackKind, Message, MessageId};

/// A conversation. `id` stays `None` until the backend assigns one
/// on the first completed turn of a fresh chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<String>,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: None,
            title: "New Chat".to_string(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new()
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    pub fn find_by_raw_id(&self, raw: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id.as_str() == raw)
    }

    /// The message currently receiving a stream, if any
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_streaming)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_message().is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a session for listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub updated_at: String,
    #[serde(default)]
    pub message_count: usize,
}

/// A rating submitted for an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub session_id: String,
    pub message_id: String,
    pub kind: FeedbackKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}
