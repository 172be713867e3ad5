//! WASM-target tests for chat-app (Node.js runtime).
//!
//! Exercises the JS-facing client without a network: only operations
//! that never reach the backend.

use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

use chat_app::ChatClient;

#[wasm_bindgen_test]
fn client_starts_empty() {
    let client = ChatClient::new(JsValue::UNDEFINED).unwrap();
    assert!(!client.is_streaming());
    assert!(client.session_id().is_none());
    assert!(!client.stop_streaming());

    let messages: js_sys::Array = client.messages().unwrap().into();
    assert_eq!(messages.length(), 0);
}

#[wasm_bindgen_test]
fn client_rejects_bad_config() {
    assert!(ChatClient::new(JsValue::from_str("not a config")).is_err());
}

#[wasm_bindgen_test]
fn client_rejects_unknown_feedback_kind() {
    let client = ChatClient::new(JsValue::NULL).unwrap();
    assert!(client
        .submit_feedback("m1".to_string(), "meh".to_string(), None)
        .is_err());
}

#[wasm_bindgen_test]
async fn client_blank_message_resolves_false() {
    let client = ChatClient::new(JsValue::UNDEFINED).unwrap();
    let promise = client
        .send_message("   ".to_string(), JsValue::UNDEFINED)
        .unwrap();
    let sent = JsFuture::from(promise).await.unwrap();
    assert_eq!(sent.as_bool(), Some(false));

    let events: js_sys::Array = client.drain_events().unwrap().into();
    assert_eq!(events.length(), 0);
}

#[wasm_bindgen_test]
async fn client_feedback_on_unknown_message_rejects() {
    let client = ChatClient::new(JsValue::UNDEFINED).unwrap();
    let promise = client
        .submit_feedback("missing".to_string(), "up".to_string(), None)
        .unwrap();
    assert!(JsFuture::from(promise).await.is_err());
}

#[wasm_bindgen_test]
async fn client_saves_and_clears_context() {
    let client = ChatClient::new(JsValue::UNDEFINED).unwrap();
    assert!(JsFuture::from(client.save_context()).await.is_ok());
    assert!(JsFuture::from(client.clear_context()).await.is_ok());
}
