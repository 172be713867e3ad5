//! Event framing for the response stream.
//!
//! The body is a sequence of events separated by blank lines. Each line of
//! an event may carry a `data:` prefix; the payload is the joined suffixes.
//! A payload equal to [`DONE_SENTINEL`] ends the stream out of band.
//!
//! [`EventFramer`] is the pure scanner. [`subscribe`] drives it from a
//! [`StreamTransport`] and reports through callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{select, Either, LocalBoxFuture};
use futures::{FutureExt, StreamExt};

use crate::cancel::AbortHandle;
use crate::ports::{StreamRequest, StreamTransport};

pub const DONE_SENTINEL: &str = "[DONE]";

/// SSE fields that carry no payload for this protocol
const IGNORED_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Event(String),
    Done,
}

/// Incremental scanner. Feed it reads in order; it yields complete events.
///
/// Split points never matter: a delimiter, a `\r\n` pair or a multi-byte
/// character cut across two reads is reassembled before scanning.
#[derive(Debug, Default)]
pub struct EventFramer {
    buffer: String,
    /// Incomplete UTF-8 sequence at the end of the last read
    utf8_tail: Vec<u8>,
    /// A `\r` whose meaning depends on the next character
    pending_cr: bool,
    /// Buffer prefix already searched for a delimiter
    scanned: usize,
    finished: bool,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the sentinel was seen or [`finish`](Self::finish) ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.finished {
            return Vec::new();
        }
        let text = self.decode_utf8(chunk);
        self.append_normalized(&text);
        self.drain_events()
    }

    /// Natural end of stream: flush held bytes and a trailing event
    /// that was never closed by a blank line.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.finished {
            return Vec::new();
        }
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.append_normalized(&String::from_utf8_lossy(&tail));
        }
        if self.pending_cr {
            self.pending_cr = false;
            self.buffer.push('\n');
        }
        let mut frames = self.drain_events();
        if !self.finished {
            let rest = std::mem::take(&mut self.buffer);
            frames.extend(parse_block(&rest));
            self.finished = true;
        }
        frames
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = &bytes[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.utf8_tail = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Append text with `\r\n` and lone `\r` rewritten to `\n`.
    fn append_normalized(&mut self, text: &str) {
        for ch in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                self.buffer.push('\n');
                if ch == '\n' {
                    continue;
                }
            }
            if ch == '\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(ch);
            }
        }
    }

    fn drain_events(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            let Some(offset) = self.buffer[self.scanned..].find("\n\n") else {
                // Keep a trailing newline in range: its pair may arrive next
                self.scanned = if self.buffer.ends_with('\n') {
                    self.buffer.len() - 1
                } else {
                    self.buffer.len()
                };
                break;
            };
            let end = self.scanned + offset;
            let block: String = self.buffer.drain(..end + 2).collect();
            self.scanned = 0;
            let Some(frame) = parse_block(&block[..end]) else {
                continue;
            };
            if frame == Frame::Done {
                // Whatever follows the sentinel is never delivered
                self.finished = true;
                self.buffer.clear();
                self.scanned = 0;
                self.utf8_tail.clear();
                self.pending_cr = false;
                frames.push(frame);
                break;
            }
            frames.push(frame);
        }
        frames
    }
}

/// Turn the lines of one event into a frame. Empty payloads yield nothing.
fn parse_block(block: &str) -> Option<Frame> {
    let mut data: Vec<&str> = Vec::new();
    for line in block.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        } else if !IGNORED_FIELDS.iter().any(|field| line.starts_with(field)) {
            data.push(line);
        }
    }

    let payload = data.join("\n");
    if payload.is_empty() {
        None
    } else if payload.trim() == DONE_SENTINEL {
        Some(Frame::Done)
    } else {
        Some(Frame::Event(payload))
    }
}

// ─── Stream subscription ─────────────────────────────────────

/// Fires a completion callback at most once, whoever asks first.
#[derive(Clone)]
pub struct DoneGuard {
    callback: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl DoneGuard {
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Self {
            callback: Rc::new(RefCell::new(Some(Box::new(callback)))),
        }
    }

    /// Returns `false` if the callback already ran.
    pub fn fire(&self) -> bool {
        let callback = self.callback.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

pub struct StreamHandlers {
    pub on_event: Box<dyn FnMut(String)>,
    pub on_done: Box<dyn FnOnce()>,
}

/// Open a stream and frame it.
///
/// Returns the handle that cancels the stream and the future that pumps it;
/// the caller spawns or awaits the future. `on_done` runs exactly once:
/// after the sentinel, at natural end, on a transport error, or when the
/// handle is aborted (synchronously, from inside `abort()`).
pub fn subscribe(
    transport: Rc<dyn StreamTransport>,
    request: StreamRequest,
    handlers: StreamHandlers,
) -> (AbortHandle, LocalBoxFuture<'static, ()>) {
    let abort = AbortHandle::new();
    let done = DoneGuard::new(handlers.on_done);
    {
        let done = done.clone();
        abort.on_abort(move || {
            done.fire();
        });
    }
    let pump = pump(transport, request, abort.clone(), handlers.on_event, done).boxed_local();
    (abort, pump)
}

async fn pump(
    transport: Rc<dyn StreamTransport>,
    request: StreamRequest,
    abort: AbortHandle,
    mut on_event: Box<dyn FnMut(String)>,
    done: DoneGuard,
) {
    let opened = match select(transport.open(&request, &abort), abort.aborted()).await {
        Either::Left((result, _)) => Some(result),
        Either::Right(_) => None,
    };
    let mut body = match opened {
        Some(Ok(body)) => body,
        Some(Err(e)) => {
            log::warn!("Stream request failed: {}", e);
            done.fire();
            return;
        }
        None => {
            done.fire();
            return;
        }
    };

    let mut framer = EventFramer::new();
    loop {
        let next = match select(body.next(), abort.aborted()).await {
            Either::Left((item, _)) => item,
            Either::Right(_) => {
                log::debug!("Stream aborted before next read");
                break;
            }
        };
        match next {
            Some(Ok(chunk)) => {
                if !deliver(framer.push(&chunk), on_event.as_mut(), &abort) {
                    break;
                }
            }
            Some(Err(e)) => {
                log::warn!("Stream read failed: {}", e);
                break;
            }
            None => {
                deliver(framer.finish(), on_event.as_mut(), &abort);
                break;
            }
        }
    }
    done.fire();
}

/// Hand frames to the callback in order. Returns `false` once the stream
/// must stop reading.
fn deliver(frames: Vec<Frame>, on_event: &mut dyn FnMut(String), abort: &AbortHandle) -> bool {
    for frame in frames {
        if abort.is_aborted() {
            return false;
        }
        match frame {
            Frame::Event(payload) => on_event(payload),
            Frame::Done => {
                log::debug!("Stream sentinel received");
                abort.abort();
                return false;
            }
        }
    }
    !abort.is_aborted()
}
