//! REST persistence collaborators.
//!
//! Uses browser `fetch()` via gloo-net. Bodies here are small JSON
//! documents, so buffering them is fine.

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use chat_core::ports::PersistencePort;
use chat_types::{
    ChatError, Result,
    config::ClientConfig,
    message::Message,
    session::{Feedback, SessionSummary},
};

use super::wire::{Listing, LoggedMessage, WireMessage, WireSession};

pub struct RestPersistence {
    config: ClientConfig,
}

impl RestPersistence {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl PersistencePort for RestPersistence {
    async fn create_session(&self, title: &str) -> Result<SessionSummary> {
        let response = Request::post(&self.config.sessions_url())
            .json(&json!({ "title": title }))
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let session: WireSession = read_json(response).await?;
        session
            .into_summary()
            .ok_or_else(|| ChatError::Other("Created session has no id".to_string()))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let response = Request::get(&self.config.sessions_url())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let listing: Listing<WireSession> = read_json(response).await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .filter_map(WireSession::into_summary)
            .collect())
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let url = self.config.history_url(session_id);
        let response = Request::get(&url)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let listing: Listing<WireMessage> = read_json(response).await?;
        let entries = listing.into_vec();
        let total = entries.len();
        let messages: Vec<Message> = entries
            .into_iter()
            .filter_map(WireMessage::into_message)
            .collect();
        if messages.len() < total {
            log::warn!(
                "Dropped {} history entries without an id for {}",
                total - messages.len(),
                session_id
            );
        }
        log::debug!("Fetched {} messages for {}", messages.len(), session_id);
        Ok(messages)
    }

    async fn log_message(&self, session_id: &str, message: &Message) -> Result<()> {
        let response = Request::post(&self.config.messages_url(session_id))
            .json(&LoggedMessage::from(message))
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        ensure_ok(response).await.map(|_| ())
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()> {
        let response = Request::post(&self.config.feedback_url())
            .json(feedback)
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        ensure_ok(response).await.map(|_| ())
    }
}

async fn ensure_ok(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(ChatError::Http { status, body })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    ensure_ok(response)
        .await?
        .json()
        .await
        .map_err(|e| ChatError::Serialization(e.to_string()))
}
