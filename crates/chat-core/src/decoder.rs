//! Payload decoding.
//!
//! Payloads are JSON objects tagged by `"type"`. Anything else, including
//! JSON with an unknown tag or the wrong shape, is answer text: heartbeat
//! lines and newer protocol additions must not break an older client.

use serde_json::Value;
use chat_types::event::StreamEvent;
use chat_types::message::Source;

pub fn decode(payload: &str) -> StreamEvent {
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => event,
        Err(e) => {
            log::trace!("Payload is not a protocol event ({}), treating as text", e);
            StreamEvent::Raw(payload.to_string())
        }
    }
}

/// Sources reported in a tool result.
///
/// Retrieval tools report `sources` or `documents` as objects
/// (`id`, `title`, `url`, `score`); web search reports `source_urls`.
/// Duplicate ids keep their first occurrence.
pub fn sources_from_result(result: &Value) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();

    for key in ["sources", "documents"] {
        if let Some(items) = result.get(key).and_then(Value::as_array) {
            sources.extend(items.iter().filter_map(source_from_object));
        }
    }

    if let Some(urls) = result.get("source_urls").and_then(Value::as_array) {
        sources.extend(urls.iter().filter_map(Value::as_str).map(|url| Source {
            id: url.to_string(),
            title: url.to_string(),
            url: Some(url.to_string()),
            score: 0.0,
        }));
    }

    let mut seen = std::collections::HashSet::new();
    sources.retain(|s| seen.insert(s.id.clone()));
    sources
}

fn source_from_object(item: &Value) -> Option<Source> {
    let url = item.get("url").and_then(Value::as_str).map(String::from);
    let id = item.get("id").and_then(id_string).or_else(|| url.clone())?;
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| url.clone())
        .unwrap_or_else(|| id.clone());
    let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0);
    Some(Source { id, title, url, score })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
