//! WASM-target tests for chat-platform (Node.js runtime).
//!
//! Tests MemoryStorage, backend selection and the persistence wire shapes
//! under wasm32-unknown-unknown via `wasm-pack test --node`.
//!
//! localStorage and fetch need a browser and are not exercised here.

use wasm_bindgen_test::*;

use chat_core::context::SavedContext;
use chat_core::ports::StoragePort;
use chat_platform::api::wire::{Listing, LoggedMessage, WireMessage, WireSession};
use chat_platform::storage::{open_storage, MemoryStorage};
use chat_platform::FetchStreamTransport;
use chat_types::config::{ClientConfig, StorageBackendType, StorageConfig};
use chat_types::message::{FeedbackKind, Message, Role};

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_set_get_delete() {
    let storage = MemoryStorage::new();
    assert!(storage.get("key").await.unwrap().is_none());
    storage.set("key", "v1").await.unwrap();
    storage.set("key", "v2").await.unwrap();
    assert_eq!(storage.get("key").await.unwrap().as_deref(), Some("v2"));
    assert!(storage.exists("key").await.unwrap());
    storage.delete("key").await.unwrap();
    assert!(!storage.exists("key").await.unwrap());
    storage.delete("key").await.unwrap();
}

#[wasm_bindgen_test]
fn auto_storage_falls_back_without_window() {
    let storage = open_storage(&StorageConfig::default());
    assert_eq!(storage.backend_name(), "memory");

    let storage = open_storage(&StorageConfig {
        backend: StorageBackendType::Memory,
    });
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn saved_context_round_trips_through_storage() {
    let storage = MemoryStorage::new();
    let saved = SavedContext {
        config: ClientConfig {
            api_base: "https://chat.example.com".to_string(),
            ..ClientConfig::default()
        },
        session_id: Some("s-1".to_string()),
    };
    saved.save(&storage).await.unwrap();
    assert_eq!(SavedContext::load(&storage).await.unwrap(), Some(saved));
}

// ─── Transport Tests ─────────────────────────────────────

#[wasm_bindgen_test]
fn fetch_transport_uses_configured_endpoint() {
    let config = ClientConfig {
        api_base: "https://chat.example.com/".to_string(),
        ..ClientConfig::default()
    };
    let transport = FetchStreamTransport::new(&config);
    assert_eq!(transport.url(), "https://chat.example.com/api/chat/stream");
}

// ─── Wire Shape Tests ────────────────────────────────────

#[wasm_bindgen_test]
fn history_accepts_bare_and_wrapped_lists() {
    let bare: Listing<WireMessage> =
        serde_json::from_str(r#"[{"id":1,"role":"user","content":"hi"}]"#).unwrap();
    assert_eq!(bare.into_vec().len(), 1);

    let wrapped: Listing<WireMessage> = serde_json::from_str(
        r#"{"messages":[{"id":"a","role":"assistant","content":"yo"},{"id":"b","role":"user","content":"ok"}]}"#,
    )
    .unwrap();
    assert_eq!(wrapped.into_vec().len(), 2);
}

#[wasm_bindgen_test]
fn history_entries_become_durable_messages() {
    let entry: WireMessage = serde_json::from_str(
        r#"{"id":42,"role":"assistant","content":"answer","created_at":"2024-01-01T00:00:00Z","feedback":"up","steps":["reasoning"]}"#,
    )
    .unwrap();
    let message = entry.into_message().unwrap();
    assert_eq!(message.id.as_str(), "42");
    assert!(!message.id.is_temporary());
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.timestamp, "2024-01-01T00:00:00Z");
    assert_eq!(message.feedback, Some(FeedbackKind::Up));
    assert_eq!(message.steps, vec!["reasoning"]);
    assert!(!message.is_streaming);

    let no_id: WireMessage = serde_json::from_str(r#"{"id":null,"role":"user"}"#).unwrap();
    assert!(no_id.into_message().is_none());
}

#[wasm_bindgen_test]
fn session_summary_defaults_title() {
    let session: WireSession = serde_json::from_str(r#"{"session_id":"s-9"}"#).unwrap();
    let summary = session.into_summary().unwrap();
    assert_eq!(summary.id, "s-9");
    assert_eq!(summary.title, "New Chat");
}

#[wasm_bindgen_test]
fn logged_message_omits_empty_detail() {
    let message = Message::persisted("m1", Role::Assistant, "(stopped)");
    let json = serde_json::to_value(LoggedMessage::from(&message)).unwrap();
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"], "(stopped)");
    assert!(json.get("steps").is_none());
}
