//! JSON shapes of the persistence endpoints.
//!
//! The backend is lenient about naming (`session_id` vs `id`, numeric ids,
//! bare arrays vs wrapped lists); these types absorb that and hand the core
//! its own types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chat_types::message::{Attachment, FeedbackKind, Message, Role, Source};
use chat_types::session::SessionSummary;
use chat_types::tool::ToolProgress;

/// A list returned bare or wrapped in an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "sessions", alias = "messages", alias = "history")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireSession {
    #[serde(alias = "session_id")]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "updated")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub message_count: usize,
}

impl WireSession {
    pub fn into_summary(self) -> Option<SessionSummary> {
        Some(SessionSummary {
            id: id_string(&self.id)?,
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "New Chat".to_string()),
            updated_at: self.updated_at.unwrap_or_default(),
            message_count: self.message_count,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub id: Value,
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tools: Vec<ToolProgress>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub feedback: Option<FeedbackKind>,
}

impl WireMessage {
    /// History entries always carry durable ids. Entries without a usable
    /// id are dropped.
    pub fn into_message(self) -> Option<Message> {
        let id = id_string(&self.id)?;
        let role = match self.role.to_ascii_lowercase().as_str() {
            "user" | "human" => Role::User,
            _ => Role::Assistant,
        };
        let mut message = Message::persisted(id, role, self.content);
        if let Some(timestamp) = self.timestamp {
            message.timestamp = timestamp;
        }
        message.steps = self.steps;
        message.tools = self.tools;
        message.sources = self.sources;
        message.attachments = self.attachments;
        message.feedback = self.feedback;
        Some(message)
    }
}

/// Body sent when logging a message the backend did not record itself
#[derive(Debug, Serialize)]
pub struct LoggedMessage<'a> {
    pub role: Role,
    pub content: &'a str,
    pub timestamp: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub steps: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub tools: &'a [ToolProgress],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub sources: &'a [Source],
}

impl<'a> From<&'a Message> for LoggedMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role,
            content: &message.content,
            timestamp: &message.timestamp,
            steps: &message.steps,
            tools: &message.tools,
            sources: &message.sources,
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
