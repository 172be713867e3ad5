use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::MessageId;

/// Events carried on the response stream, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Coarse progress of the backend pipeline
    Status { stage: Stage },

    /// The backend planned which tools it will run
    ToolsDecided {
        #[serde(default)]
        tools: Vec<ToolDescriptor>,
    },

    /// A planned tool started running
    ToolStart { tool: ToolDescriptor },

    /// A tool finished, successfully or not
    ToolEnd {
        tool: ToolDescriptor,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        result: Option<Value>,
    },

    /// A fragment of the answer text
    AnswerChunk { content: String },

    /// Authoritative answer; terminates the turn
    Final {
        answer: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tools: Option<Vec<ToolDescriptor>>,
    },

    /// Backend failure; terminates the turn
    Error {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        message: Option<String>,
    },

    /// Payload that is not a recognized event. Applied as answer text.
    #[serde(skip)]
    Raw(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Final { .. } | StreamEvent::Error { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::ToolsDecided { .. } => "tools_decided",
            StreamEvent::ToolStart { .. } => "tool_start",
            StreamEvent::ToolEnd { .. } => "tool_end",
            StreamEvent::AnswerChunk { .. } => "answer_chunk",
            StreamEvent::Final { .. } => "final",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Raw(_) => "raw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DecidingTools,
    Synthesizing,
    Completed,
    #[serde(other)]
    Other,
}

impl Stage {
    /// Trace label recorded on the assistant message, if the stage has one
    pub fn step_label(&self) -> Option<&'static str> {
        match self {
            Stage::DecidingTools => Some("reasoning"),
            Stage::Synthesizing => Some("generating"),
            Stage::Completed => Some("done"),
            Stage::Other => None,
        }
    }
}

/// A tool as described by the backend in tool events.
/// Only `id` is required; the rest depends on the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub tool_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,
    #[serde(alias = "rationale", skip_serializing_if = "Option::is_none", default)]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_type: None,
            status: None,
            reasoning: None,
            error: None,
            result: None,
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// A `final` event arrived
    Completed,
    /// An `error` event arrived
    Failed,
    /// The caller stopped the stream
    Cancelled,
    /// The stream ended without a terminal event
    Interrupted,
}

/// Notifications emitted by the session controller.
/// Rendering collaborators drain these to refresh their views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    TurnStarted { message_id: MessageId },

    MessageUpdated { message_id: MessageId },

    /// The backend assigned the session its durable id
    SessionCreated { session_id: String },

    /// Session list and this session's conversation must be refetched
    CachesInvalidated { session_id: String },

    HistoryMerged { session_id: String, message_count: usize },

    TurnEnded { message_id: MessageId, outcome: TurnOutcome },
}
