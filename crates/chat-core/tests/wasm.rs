//! WASM-target tests for chat-core.
//!
//! Runs the framer, decoder, turn machine, reconciliation and controller
//! under wasm32-unknown-unknown via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use chat_core::cancel::{AbortHandle, STOPPED_PLACEHOLDER};
use chat_core::decoder::decode;
use chat_core::framer::{EventFramer, Frame};
use chat_core::ports::*;
use chat_core::reconcile::reconcile;
use chat_core::turn::TurnMachine;
use chat_core::ChatController;
use chat_types::config::ClientConfig;
use chat_types::event::{StreamEvent, TurnOutcome};
use chat_types::message::*;
use chat_types::session::{Feedback, Session, SessionSummary};
use chat_types::Result;

use std::rc::Rc;
use async_trait::async_trait;
use futures::stream;

fn sse(payload: &str) -> Vec<u8> {
    format!("data: {}\n\n", payload).into_bytes()
}

// ─── Framer Tests ────────────────────────────────────────

#[wasm_bindgen_test]
fn framer_byte_by_byte() {
    let input = "data: a\r\n\r\ndata: ünï\n\ndata: [DONE]\n\n".as_bytes();
    let mut framer = EventFramer::new();
    let mut frames = Vec::new();
    for byte in input {
        frames.extend(framer.push(std::slice::from_ref(byte)));
    }
    assert_eq!(
        frames,
        vec![
            Frame::Event("a".to_string()),
            Frame::Event("ünï".to_string()),
            Frame::Done
        ]
    );
}

#[wasm_bindgen_test]
fn framer_finish_flushes() {
    let mut framer = EventFramer::new();
    assert!(framer.push(b"data: tail").is_empty());
    assert_eq!(framer.finish(), vec![Frame::Event("tail".to_string())]);
}

// ─── Decoder Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn decode_unknown_payload_is_text() {
    assert_eq!(decode("hello"), StreamEvent::Raw("hello".to_string()));
}

// ─── Turn / Reconcile Tests ──────────────────────────────

#[wasm_bindgen_test]
fn turn_cancel_empty_message() {
    let mut session = Session::new();
    let mut machine = TurnMachine::begin(&mut session, "q", vec![]);
    machine.cancel(&mut session);
    let reply = session.message(machine.placeholder_id()).unwrap();
    assert_eq!(reply.content, STOPPED_PLACEHOLDER);
    assert!(!reply.is_streaming);
}

#[wasm_bindgen_test]
fn reconcile_swaps_in_persisted_ids() {
    let current = vec![Message::user("q", vec![])];
    let fetched = vec![Message::persisted("m1", Role::User, "q")];
    let merged = reconcile(&current, fetched).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id.as_str(), "m1");
}

// ─── Controller Tests ────────────────────────────────────

struct ScriptTransport {
    chunks: Vec<Vec<u8>>,
}

#[async_trait(?Send)]
impl StreamTransport for ScriptTransport {
    async fn open(&self, _request: &StreamRequest, _abort: &AbortHandle) -> Result<ByteStream> {
        let chunks: Vec<Result<Vec<u8>>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

struct EmptyPersistence;

#[async_trait(?Send)]
impl PersistencePort for EmptyPersistence {
    async fn create_session(&self, title: &str) -> Result<SessionSummary> {
        Ok(SessionSummary {
            id: "s-1".to_string(),
            title: title.to_string(),
            updated_at: String::new(),
            message_count: 0,
        })
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(Vec::new())
    }

    async fn fetch_history(&self, _session_id: &str) -> Result<Vec<Message>> {
        Ok(Vec::new())
    }

    async fn log_message(&self, _session_id: &str, _message: &Message) -> Result<()> {
        Ok(())
    }

    async fn submit_feedback(&self, _feedback: &Feedback) -> Result<()> {
        Ok(())
    }
}

#[wasm_bindgen_test]
async fn controller_streams_a_turn() {
    let transport = ScriptTransport {
        chunks: vec![
            sse(r#"{"type":"answer_chunk","content":"Hi"}"#),
            sse(r#"{"type":"final","answer":"Hi there","session_id":"s-7"}"#),
            sse("[DONE]"),
        ],
    };
    let controller = ChatController::new(
        ClientConfig::default(),
        Rc::new(transport),
        Rc::new(EmptyPersistence),
    );

    assert!(controller.send_message("hello", vec![]).await);
    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hi there");
    assert_eq!(controller.session_id().as_deref(), Some("s-7"));
    assert_eq!(controller.last_outcome(), Some(TurnOutcome::Completed));
}

#[wasm_bindgen_test]
async fn controller_interrupted_stream() {
    let transport = ScriptTransport { chunks: vec![] };
    let controller = ChatController::new(
        ClientConfig {
            synthesize_transport_errors: false,
            ..ClientConfig::default()
        },
        Rc::new(transport),
        Rc::new(EmptyPersistence),
    );

    assert!(!controller.send_message("hello", vec![]).await);
    assert!(controller.messages()[1].content.is_empty());
    assert_eq!(controller.last_outcome(), Some(TurnOutcome::Interrupted));
}
