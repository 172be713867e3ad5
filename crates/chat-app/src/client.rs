//! JavaScript-facing chat client.
//!
//! Wraps a [`ChatController`] wired to the browser adapters. Async
//! operations return Promises; data crosses the boundary as plain JS
//! objects via serde.

use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use js_sys::Promise;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use chat_core::context::SavedContext;
use chat_core::ports::StoragePort;
use chat_core::ChatController;
use chat_platform::storage::open_storage;
use chat_platform::{FetchStreamTransport, RestPersistence};
use chat_types::config::{ClientConfig, StorageConfig};
use chat_types::message::{Attachment, FeedbackKind};

#[wasm_bindgen]
pub struct ChatClient {
    controller: ChatController,
    storage: Rc<dyn StoragePort>,
}

impl ChatClient {
    fn with_config(config: ClientConfig) -> Self {
        let storage = open_storage(&config.storage);
        let transport = Rc::new(FetchStreamTransport::new(&config));
        let persistence = Rc::new(RestPersistence::new(config.clone()));
        Self {
            controller: ChatController::new(config, transport, persistence),
            storage,
        }
    }
}

#[wasm_bindgen]
impl ChatClient {
    /// `config` may be omitted; missing fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ChatClient, JsValue> {
        let config: ClientConfig = from_js_or_default(config)?;
        Ok(Self::with_config(config))
    }

    /// Build a client from the context saved by `saveContext`, reopening
    /// its session. Falls back to defaults when nothing was saved.
    #[wasm_bindgen(js_name = loadContext)]
    pub async fn load_context() -> Result<ChatClient, JsValue> {
        let storage = open_storage(&StorageConfig::default());
        let saved = SavedContext::load(storage.as_ref()).await.map_err(to_js)?;
        match saved {
            Some(saved) => {
                let client = Self::with_config(saved.config.clone());
                if let Err(e) = client.controller.resume(saved).await {
                    log::warn!("Could not reopen saved session: {}", e);
                }
                Ok(client)
            }
            None => Ok(Self::with_config(ClientConfig::default())),
        }
    }

    /// Resolves `true` once the answer is complete, `false` otherwise.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, content: String, attachments: JsValue) -> Result<Promise, JsValue> {
        let attachments: Vec<Attachment> = from_js_or_default(attachments)?;
        let controller = self.controller.clone();
        Ok(future_to_promise(async move {
            let completed = controller.send_message(&content, attachments).await;
            Ok(JsValue::from_bool(completed))
        }))
    }

    #[wasm_bindgen(js_name = stopStreaming)]
    pub fn stop_streaming(&self) -> bool {
        self.controller.stop_streaming()
    }

    /// `kind` is `"up"` or `"down"`.
    #[wasm_bindgen(js_name = submitFeedback)]
    pub fn submit_feedback(
        &self,
        message_id: String,
        kind: String,
        comment: Option<String>,
    ) -> Result<Promise, JsValue> {
        let kind = match kind.as_str() {
            "up" => FeedbackKind::Up,
            "down" => FeedbackKind::Down,
            other => return Err(to_js(format!("Unknown feedback kind: {}", other))),
        };
        let controller = self.controller.clone();
        Ok(future_to_promise(async move {
            controller
                .submit_feedback(&message_id, kind, comment)
                .await
                .map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = openSession)]
    pub fn open_session(&self, session_id: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.open_session(&session_id).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = createSession)]
    pub fn create_session(&self, title: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let summary = controller.create_session(&title).await.map_err(to_js)?;
            JsValue::from_serde(&summary).map_err(to_js)
        })
    }

    #[wasm_bindgen(js_name = newChat)]
    pub fn new_chat(&self) {
        self.controller.new_chat();
    }

    #[wasm_bindgen(js_name = listSessions)]
    pub fn list_sessions(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let sessions = controller.list_sessions().await.map_err(to_js)?;
            JsValue::from_serde(&sessions).map_err(to_js)
        })
    }

    #[wasm_bindgen(js_name = refreshHistory)]
    pub fn refresh_history(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let merged = controller.refresh_history().await.map_err(to_js)?;
            Ok(JsValue::from_bool(merged))
        })
    }

    pub fn messages(&self) -> Result<JsValue, JsValue> {
        JsValue::from_serde(&self.controller.messages()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> Option<String> {
        self.controller.session_id()
    }

    #[wasm_bindgen(js_name = isStreaming)]
    pub fn is_streaming(&self) -> bool {
        self.controller.is_streaming()
    }

    /// Session events since the last call, oldest first.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&self) -> Result<JsValue, JsValue> {
        JsValue::from_serde(&self.controller.drain_events()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = saveContext)]
    pub fn save_context(&self) -> Promise {
        let controller = self.controller.clone();
        let storage = self.storage.clone();
        future_to_promise(async move {
            controller
                .save_context(storage.as_ref())
                .await
                .map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Forget the saved context; the next `loadContext` starts fresh.
    #[wasm_bindgen(js_name = clearContext)]
    pub fn clear_context(&self) -> Promise {
        let storage = self.storage.clone();
        future_to_promise(async move {
            SavedContext::clear(storage.as_ref()).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }
}

fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    value.into_serde().map_err(to_js)
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}
