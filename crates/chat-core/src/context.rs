//! Session-scoped context owned by the caller.
//!
//! Only the configuration and the id of the open session are ever written
//! to storage; messages always come back from the backend.

use serde::{Deserialize, Serialize};
use chat_types::{config::ClientConfig, session::Session, Result};

use crate::ports::StoragePort;

pub const CONTEXT_STORAGE_KEY: &str = "chat:context";

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub config: ClientConfig,
    pub session: Session,
}

impl SessionContext {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: Session::new(),
        }
    }

    pub fn snapshot(&self) -> SavedContext {
        SavedContext {
            config: self.config.clone(),
            session_id: self.session.id.clone(),
        }
    }
}

/// The persisted part of a [`SessionContext`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedContext {
    pub config: ClientConfig,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SavedContext {
    pub async fn save(&self, storage: &dyn StoragePort) -> Result<()> {
        let json = serde_json::to_string(self)?;
        storage.set(CONTEXT_STORAGE_KEY, &json).await?;
        log::info!("Context saved to {}", storage.backend_name());
        Ok(())
    }

    /// `Ok(None)` when nothing was saved yet.
    pub async fn load(storage: &dyn StoragePort) -> Result<Option<Self>> {
        match storage.get(CONTEXT_STORAGE_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn clear(storage: &dyn StoragePort) -> Result<()> {
        storage.delete(CONTEXT_STORAGE_KEY).await
    }
}
