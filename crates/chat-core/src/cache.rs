//! Client-side cache of backend history.
//!
//! Holds the session list and per-session conversation snapshots until a
//! completed turn invalidates them.

use std::collections::HashMap;
use chat_types::message::Message;
use chat_types::session::SessionSummary;

#[derive(Debug, Default)]
pub struct HistoryCache {
    sessions: Option<Vec<SessionSummary>>,
    conversations: HashMap<String, Vec<Message>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Option<&[SessionSummary]> {
        self.sessions.as_deref()
    }

    pub fn store_sessions(&mut self, sessions: Vec<SessionSummary>) {
        self.sessions = Some(sessions);
    }

    pub fn conversation(&self, session_id: &str) -> Option<&[Message]> {
        self.conversations.get(session_id).map(Vec::as_slice)
    }

    pub fn store_conversation(&mut self, session_id: &str, messages: Vec<Message>) {
        self.conversations.insert(session_id.to_string(), messages);
    }

    pub fn invalidate_sessions(&mut self) {
        self.sessions = None;
    }

    /// Drop the session list and this session's conversation.
    pub fn invalidate_session(&mut self, session_id: &str) {
        self.sessions = None;
        self.conversations.remove(session_id);
    }
}
