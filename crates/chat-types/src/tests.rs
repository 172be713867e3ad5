#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::*;
    use crate::message::*;
    use crate::event::*;
    use crate::tool::*;
    use crate::config::*;
    use crate::session::*;

    // ─── MessageId Tests ─────────────────────────────────────

    #[test]
    fn test_temporary_id_has_prefix() {
        let id = MessageId::temporary();
        assert!(id.is_temporary());
        assert!(id.as_str().starts_with(TEMP_ID_PREFIX));
    }

    #[test]
    fn test_temporary_ids_are_unique() {
        assert_ne!(MessageId::temporary(), MessageId::temporary());
    }

    #[test]
    fn test_message_id_parse() {
        assert!(MessageId::parse("temp-123").is_temporary());
        assert_eq!(MessageId::parse("42"), MessageId::Durable("42".to_string()));
    }

    #[test]
    fn test_message_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&MessageId::durable("m1")).unwrap();
        assert_eq!(json, r#""m1""#);

        let id: MessageId = serde_json::from_str(r#""temp-abc""#).unwrap();
        assert_eq!(id, MessageId::Temporary("temp-abc".to_string()));
    }

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello", Vec::new());
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.id.is_temporary());
        assert!(!msg.is_streaming);
    }

    #[test]
    fn test_message_assistant_placeholder() {
        let msg = Message::assistant_placeholder();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.is_streaming);
        assert!(msg.steps.is_empty());
        assert!(msg.tools.is_empty());
    }

    #[test]
    fn test_message_persisted_is_durable() {
        let msg = Message::persisted("m7", Role::Assistant, "hi");
        assert!(!msg.id.is_temporary());
        assert_eq!(msg.id.as_str(), "m7");
    }

    #[test]
    fn test_push_step_skips_consecutive_duplicates() {
        let mut msg = Message::assistant_placeholder();
        assert!(msg.push_step("reasoning"));
        assert!(!msg.push_step("reasoning"));
        assert!(msg.push_step("generating"));
        assert!(msg.push_step("reasoning"));
        assert_eq!(msg.steps, vec!["reasoning", "generating", "reasoning"]);
    }

    #[test]
    fn test_message_deserializes_with_missing_collections() {
        let json = r#"{"id":"m1","role":"assistant","content":"x","timestamp":"t"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.tools.is_empty());
        assert!(msg.sources.is_empty());
        assert!(msg.feedback.is_none());
        assert!(!msg.is_streaming);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
    }

    // ─── Tool Tests ──────────────────────────────────────────

    #[test]
    fn test_tool_status_from_wire_aliases() {
        assert_eq!(ToolStatus::from_wire("succeeded"), Some(ToolStatus::Succeeded));
        assert_eq!(ToolStatus::from_wire("success"), Some(ToolStatus::Succeeded));
        assert_eq!(ToolStatus::from_wire("Completed"), Some(ToolStatus::Succeeded));
        assert_eq!(ToolStatus::from_wire("error"), Some(ToolStatus::Failed));
        assert_eq!(ToolStatus::from_wire("running"), Some(ToolStatus::Running));
        assert_eq!(ToolStatus::from_wire("exploded"), None);
    }

    #[test]
    fn test_tool_progress_serializes_type_field() {
        let tool = ToolProgress::planned("t1", "search_web");
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "search_web");
        assert_eq!(json["status"], "pending");
        assert!(json.get("error").is_none());
    }

    // ─── StreamEvent Tests ───────────────────────────────────

    #[test]
    fn test_stream_event_status_deserialization() {
        let ev: StreamEvent =
            serde_json::from_str(r#"{"type":"status","stage":"deciding_tools"}"#).unwrap();
        assert_eq!(ev, StreamEvent::Status { stage: Stage::DecidingTools });
    }

    #[test]
    fn test_unknown_stage_maps_to_other() {
        let ev: StreamEvent =
            serde_json::from_str(r#"{"type":"status","stage":"warming_up"}"#).unwrap();
        assert_eq!(ev, StreamEvent::Status { stage: Stage::Other });
        assert_eq!(Stage::Other.step_label(), None);
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::DecidingTools.step_label(), Some("reasoning"));
        assert_eq!(Stage::Synthesizing.step_label(), Some("generating"));
        assert_eq!(Stage::Completed.step_label(), Some("done"));
    }

    #[test]
    fn test_final_event_optional_fields() {
        let ev: StreamEvent =
            serde_json::from_str(r#"{"type":"final","answer":"ok"}"#).unwrap();
        match ev {
            StreamEvent::Final { answer, session_id, tools } => {
                assert_eq!(answer, "ok");
                assert!(session_id.is_none());
                assert!(tools.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_tool_descriptor_accepts_rationale_alias() {
        let tool: ToolDescriptor =
            serde_json::from_str(r#"{"id":"t1","type":"search_web","rationale":"need facts"}"#)
                .unwrap();
        assert_eq!(tool.reasoning.as_deref(), Some("need facts"));
        assert_eq!(tool.tool_type.as_deref(), Some("search_web"));
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Error { message: None }.is_terminal());
        assert!(!StreamEvent::AnswerChunk { content: "x".into() }.is_terminal());
        assert!(!StreamEvent::Raw("x".into()).is_terminal());
    }

    #[test]
    fn test_session_event_serialization() {
        let ev = SessionEvent::SessionCreated { session_id: "s1".into() };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "session_created");
        assert_eq!(json["session_id"], "s1");
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_session_new_has_no_id() {
        let session = Session::new();
        assert!(session.id.is_none());
        assert!(session.messages.is_empty());
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_session_streaming_message() {
        let mut session = Session::with_id("s1");
        session.messages.push(Message::user("q", Vec::new()));
        session.messages.push(Message::assistant_placeholder());
        let streaming = session.streaming_message().unwrap();
        assert_eq!(streaming.role, Role::Assistant);
    }

    // ─── Config Tests ────────────────────────────────────────

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert!(config.refresh_after_turn);
        assert!(config.synthesize_transport_errors);
        assert_eq!(config.storage.backend, StorageBackendType::Auto);
    }

    #[test]
    fn test_config_urls() {
        let config = ClientConfig {
            api_base: "https://chat.example/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.stream_url(), "https://chat.example/api/chat/stream");
        assert_eq!(
            config.history_url("s1"),
            "https://chat.example/api/sessions/s1/history"
        );
    }

    #[test]
    fn test_config_partial_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_base":"http://x","refresh_after_turn":false}"#).unwrap();
        assert_eq!(config.api_base, "http://x");
        assert!(!config.refresh_after_turn);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = ChatError::Http { status: 502, body: "bad gateway".into() };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
        assert_eq!(
            ChatError::TurnInFlight.to_string(),
            "A turn is already streaming in this session"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let err: ChatError = serde_json::from_str::<Message>("{").unwrap_err().into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }
}
