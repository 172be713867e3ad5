use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin of the chat backend, without trailing slash.
    /// Empty means same-origin relative paths.
    pub api_base: String,
    pub endpoints: Endpoints,
    /// Refetch the conversation after a completed turn
    pub refresh_after_turn: bool,
    /// Give an empty placeholder the apology text when the stream
    /// ends without `final` or `error`
    pub synthesize_transport_errors: bool,
    pub storage: StorageConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            endpoints: Endpoints::default(),
            refresh_after_turn: true,
            synthesize_transport_errors: true,
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    pub fn stream_url(&self) -> String {
        self.url(&self.endpoints.stream)
    }

    pub fn sessions_url(&self) -> String {
        self.url(&self.endpoints.sessions)
    }

    pub fn history_url(&self, session_id: &str) -> String {
        self.url(&self.endpoints.history.replace("{session_id}", session_id))
    }

    pub fn messages_url(&self, session_id: &str) -> String {
        self.url(&self.endpoints.messages.replace("{session_id}", session_id))
    }

    pub fn feedback_url(&self) -> String {
        self.url(&self.endpoints.feedback)
    }
}

/// Backend paths. `{session_id}` is substituted where present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub stream: String,
    pub sessions: String,
    pub history: String,
    pub messages: String,
    pub feedback: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            stream: "/api/chat/stream".to_string(),
            sessions: "/api/sessions".to_string(),
            history: "/api/sessions/{session_id}/history".to_string(),
            messages: "/api/sessions/{session_id}/messages".to_string(),
            feedback: "/api/feedback".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// Auto-detect best available backend
    Auto,
    Memory,
    LocalStorage,
}
