//! Streaming transport over browser `fetch()`.
//!
//! gloo-net buffers response bodies, so the stream is read with raw
//! web-sys bindings: a `ReadableStreamDefaultReader` pulled one chunk per
//! poll. The request carries an `AbortSignal` whose controller is fired
//! from the turn's [`AbortHandle`].

use async_trait::async_trait;
use futures::stream::{self, Stream};
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, ReadableStreamDefaultReader, Request, RequestInit, Response};

use chat_core::cancel::AbortHandle;
use chat_core::ports::{ByteStream, StreamRequest, StreamTransport};
use chat_types::{config::ClientConfig, ChatError, Result};

pub struct FetchStreamTransport {
    url: String,
}

impl FetchStreamTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            url: config.stream_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait(?Send)]
impl StreamTransport for FetchStreamTransport {
    async fn open(&self, request: &StreamRequest, abort: &AbortHandle) -> Result<ByteStream> {
        let controller = AbortController::new().map_err(js_error)?;
        let signal = controller.signal();
        abort.on_abort(move || controller.abort());

        let headers = Headers::new().map_err(js_error)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(js_error)?;
        headers
            .set("Accept", "text/event-stream")
            .map_err(js_error)?;

        let body = serde_json::to_string(request)?;
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));
        init.set_signal(Some(&signal));

        let js_request = Request::new_with_str_and_init(&self.url, &init).map_err(js_error)?;
        let window = web_sys::window()
            .ok_or_else(|| ChatError::JsInterop("No window object".to_string()))?;

        log::debug!("Opening stream: POST {}", self.url);
        let response: Response = JsFuture::from(window.fetch_with_request(&js_request))
            .await
            .map_err(|e| ChatError::Network(format!("{:?}", e)))?
            .dyn_into()
            .map_err(js_error)?;

        if !response.ok() {
            let status = response.status();
            let text = response_text(&response).await;
            return Err(ChatError::Http { status, body: text });
        }

        let body = response
            .body()
            .ok_or_else(|| ChatError::Network("Response has no body".to_string()))?;
        let reader: ReadableStreamDefaultReader = body
            .get_reader()
            .dyn_into()
            .map_err(|e| js_error(e.into()))?;
        Ok(Box::pin(read_chunks(reader)))
    }
}

/// Chunks as the browser delivers them. A failed read ends the stream
/// after yielding its error.
fn read_chunks(reader: ReadableStreamDefaultReader) -> impl Stream<Item = Result<Vec<u8>>> {
    stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_next(&reader).await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some(reader))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
}

async fn read_next(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>> {
    let result = JsFuture::from(reader.read())
        .await
        .map_err(|e| ChatError::Network(format!("{:?}", e)))?;

    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(js_error)?
        .as_bool()
        .unwrap_or(false);
    if done {
        return Ok(None);
    }

    let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_error)?;
    Ok(Some(Uint8Array::new(&value).to_vec()))
}

async fn response_text(response: &Response) -> String {
    let Ok(promise) = response.text() else {
        return String::new();
    };
    JsFuture::from(promise)
        .await
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

fn js_error(e: JsValue) -> ChatError {
    ChatError::JsInterop(format!("{:?}", e))
}
