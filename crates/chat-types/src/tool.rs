use serde::{Deserialize, Serialize};

/// Lifecycle of one backend tool invocation within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl ToolStatus {
    /// Map a server-provided status string, accepting the spellings
    /// the backend has used over time.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "planned" => Some(ToolStatus::Pending),
            "running" | "started" => Some(ToolStatus::Running),
            "succeeded" | "success" | "completed" | "done" => Some(ToolStatus::Succeeded),
            "failed" | "failure" | "error" => Some(ToolStatus::Failed),
            _ => None,
        }
    }
}

/// Progress of a tool invocation, keyed by the server-issued invocation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProgress {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ToolProgress {
    pub fn planned(id: impl Into<String>, tool_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_type: tool_type.into(),
            status: ToolStatus::Pending,
            reasoning: None,
            error: None,
        }
    }
}
