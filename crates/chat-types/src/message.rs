use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tool::ToolProgress;

/// Prefix carried by every client-generated message id.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message identifier.
///
/// Temporary ids are minted on the client for optimistic messages and are
/// replaced by durable ids once the backend's history includes the message.
/// On the wire both are plain strings; the `temp-` prefix tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    Temporary(String),
    Durable(String),
}

impl MessageId {
    pub fn temporary() -> Self {
        MessageId::Temporary(format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn durable(id: impl Into<String>) -> Self {
        MessageId::Durable(id.into())
    }

    pub fn parse(raw: &str) -> Self {
        if raw.starts_with(TEMP_ID_PREFIX) {
            MessageId::Temporary(raw.to_string())
        } else {
            MessageId::Durable(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageId::Temporary(id) | MessageId::Durable(id) => id,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, MessageId::Temporary(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MessageId::parse(&raw))
    }
}

/// A retrieval hit or web page the answer drew on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: f64,
}

/// A file sent along with a user query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Up,
    Down,
}

/// A single message in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub is_streaming: bool,
    /// Human-readable trace, never two identical entries in a row
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tools: Vec<ToolProgress>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub feedback: Option<FeedbackKind>,
}

impl Message {
    /// Optimistic user message with a temporary id.
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            attachments,
            ..Self::blank(MessageId::temporary(), Role::User, content.into())
        }
    }

    /// Empty assistant message that receives the streamed answer.
    pub fn assistant_placeholder() -> Self {
        Self {
            is_streaming: true,
            ..Self::blank(MessageId::temporary(), Role::Assistant, String::new())
        }
    }

    /// Message as returned by the backend's history.
    pub fn persisted(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self::blank(MessageId::durable(id), role, content.into())
    }

    fn blank(id: MessageId, role: Role, content: String) -> Self {
        Self {
            id,
            role,
            content,
            timestamp: chrono::Utc::now().to_rfc3339(),
            is_streaming: false,
            steps: Vec::new(),
            tools: Vec::new(),
            sources: Vec::new(),
            attachments: Vec::new(),
            feedback: None,
        }
    }

    /// Append a trace step unless it repeats the last one.
    /// Returns whether the step was recorded.
    pub fn push_step(&mut self, step: impl Into<String>) -> bool {
        let step = step.into();
        if self.steps.last() == Some(&step) {
            return false;
        }
        self.steps.push(step);
        true
    }
}
