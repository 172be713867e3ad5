//! Session controller: the caller-facing surface of the core.
//!
//! Owns the session context, the in-flight turn and the history cache.
//! Everything runs on one thread: stream callbacks and caller operations
//! interleave only at await points, and no RefCell borrow is held across
//! an await or across a call that may run callbacks.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;

use chat_types::{
    ChatError, Result,
    config::ClientConfig,
    event::{SessionEvent, TurnOutcome},
    message::{Attachment, FeedbackKind, Message, MessageId},
    session::{Feedback, Session, SessionSummary},
};

use crate::cache::HistoryCache;
use crate::cancel::AbortHandle;
use crate::context::{SavedContext, SessionContext};
use crate::decoder::decode;
use crate::event_bus::EventBus;
use crate::framer::{subscribe, StreamHandlers};
use crate::ports::{PersistencePort, StoragePort, StreamRequest, StreamTransport};
use crate::reconcile::reconcile;
use crate::turn::{TurnEffect, TurnMachine};

/// Clone-cheap handle; clones drive the same session.
#[derive(Clone)]
pub struct ChatController {
    inner: Rc<Inner>,
}

struct Inner {
    context: RefCell<SessionContext>,
    active: RefCell<Option<ActiveTurn>>,
    last_outcome: Cell<Option<TurnOutcome>>,
    cache: RefCell<HistoryCache>,
    transport: Rc<dyn StreamTransport>,
    persistence: Rc<dyn PersistencePort>,
    bus: EventBus,
}

struct ActiveTurn {
    machine: TurnMachine,
    abort: Option<AbortHandle>,
}

impl ChatController {
    pub fn new(
        config: ClientConfig,
        transport: Rc<dyn StreamTransport>,
        persistence: Rc<dyn PersistencePort>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                context: RefCell::new(SessionContext::new(config)),
                active: RefCell::new(None),
                last_outcome: Cell::new(None),
                cache: RefCell::new(HistoryCache::new()),
                transport,
                persistence,
                bus: EventBus::new(),
            }),
        }
    }

    // ─── Read access ─────────────────────────────────────────

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.inner.bus.drain()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.context.borrow().session.messages.clone()
    }

    pub fn session(&self) -> Session {
        self.inner.context.borrow().session.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.context.borrow().session.id.clone()
    }

    pub fn config(&self) -> ClientConfig {
        self.inner.context.borrow().config.clone()
    }

    /// Replace the behavioural settings.
    ///
    /// The transport and persistence adapters keep the URLs they were built
    /// with, so a config that moves `api_base` or `endpoints` is rejected.
    pub fn set_config(&self, config: ClientConfig) -> Result<()> {
        let mut ctx = self.inner.context.borrow_mut();
        if config.api_base != ctx.config.api_base || config.endpoints != ctx.config.endpoints {
            return Err(ChatError::Config(
                "api_base and endpoints are fixed once the client is built".to_string(),
            ));
        }
        ctx.config = config;
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.active.borrow().is_some()
    }

    /// How the most recent turn ended
    pub fn last_outcome(&self) -> Option<TurnOutcome> {
        self.inner.last_outcome.get()
    }

    // ─── Turns ───────────────────────────────────────────────

    /// Send a query and stream the answer into the session.
    ///
    /// Returns `true` when the turn ended with a `final` event. Returns
    /// `false` when the message was rejected (nothing to send, or a turn
    /// already in flight) or the turn failed, was stopped, or was cut off.
    pub async fn send_message(&self, content: &str, attachments: Vec<Attachment>) -> bool {
        let (placeholder, pump) = match self.start_turn(content, attachments) {
            Ok(started) => started,
            Err(e) => {
                log::warn!("Message not sent: {}", e);
                return false;
            }
        };

        pump.await;

        let outcome = self.inner.last_outcome.get();
        self.after_turn(outcome, &placeholder).await;
        outcome == Some(TurnOutcome::Completed)
    }

    /// Insert the optimistic messages and open the stream.
    /// The returned future pumps the stream to completion.
    pub fn start_turn(
        &self,
        content: &str,
        attachments: Vec<Attachment>,
    ) -> Result<(MessageId, LocalBoxFuture<'static, ()>)> {
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.is_streaming() || self.inner.context.borrow().session.is_streaming() {
            return Err(ChatError::TurnInFlight);
        }

        let (machine, request) = {
            let mut ctx = self.inner.context.borrow_mut();
            let request = StreamRequest {
                query: content.to_string(),
                session_id: ctx.session.id.clone(),
                attachments: attachments.clone(),
            };
            let machine = TurnMachine::begin(&mut ctx.session, content, attachments);
            (machine, request)
        };
        let placeholder = machine.placeholder_id().clone();

        self.inner.last_outcome.set(None);
        *self.inner.active.borrow_mut() = Some(ActiveTurn {
            machine,
            abort: None,
        });
        self.inner.bus.emit(SessionEvent::TurnStarted {
            message_id: placeholder.clone(),
        });
        log::info!("Turn started, streaming into {}", placeholder);

        let handlers = StreamHandlers {
            on_event: Box::new({
                let inner = Rc::downgrade(&self.inner);
                move |payload: String| {
                    if let Some(inner) = inner.upgrade() {
                        inner.handle_payload(&payload);
                    }
                }
            }),
            on_done: Box::new({
                let inner: Weak<Inner> = Rc::downgrade(&self.inner);
                move || {
                    if let Some(inner) = inner.upgrade() {
                        inner.finish_turn();
                    }
                }
            }),
        };
        let (abort, pump) = subscribe(self.inner.transport.clone(), request, handlers);
        if let Some(active) = self.inner.active.borrow_mut().as_mut() {
            active.abort = Some(abort);
        }
        Ok((placeholder, pump))
    }

    /// Stop the in-flight turn.
    ///
    /// The message is closed immediately; no `final` or `error` is awaited.
    /// Returns `false` if nothing was streaming.
    pub fn stop_streaming(&self) -> bool {
        let (abort, placeholder, effects) = {
            let mut active = self.inner.active.borrow_mut();
            let Some(turn) = active.as_mut() else {
                return false;
            };
            let mut ctx = self.inner.context.borrow_mut();
            let effects = turn.machine.cancel(&mut ctx.session);
            (
                turn.abort.clone(),
                turn.machine.placeholder_id().clone(),
                effects,
            )
        };
        let stopped = !effects.is_empty();
        if stopped {
            log::info!("Turn stopped by caller");
        }
        self.inner.perform(effects, &placeholder);

        // Runs the stream's on_done synchronously, which clears the turn
        if let Some(abort) = abort {
            abort.abort();
        }
        stopped
    }

    async fn after_turn(&self, outcome: Option<TurnOutcome>, placeholder: &MessageId) {
        match outcome {
            Some(TurnOutcome::Completed) if self.config().refresh_after_turn => {
                if let Err(e) = self.refresh_history().await {
                    log::warn!("History refresh after turn failed: {}", e);
                }
            }
            Some(TurnOutcome::Cancelled) => self.log_stopped_message(placeholder).await,
            _ => {}
        }
    }

    /// A stopped answer never reaches the backend's history on its own.
    async fn log_stopped_message(&self, placeholder: &MessageId) {
        let (session_id, message) = {
            let ctx = self.inner.context.borrow();
            match (&ctx.session.id, ctx.session.message(placeholder)) {
                (Some(id), Some(message)) => (id.clone(), message.clone()),
                _ => return,
            }
        };
        if let Err(e) = self.inner.persistence.log_message(&session_id, &message).await {
            log::warn!("Failed to log stopped message: {}", e);
        }
    }

    // ─── Sessions & history ──────────────────────────────────

    /// Start a fresh, id-less session. Stops any in-flight turn first.
    pub fn new_chat(&self) {
        self.stop_streaming();
        self.inner.context.borrow_mut().session = Session::new();
        log::info!("New chat");
    }

    /// Create the backend session up front instead of on the first turn.
    pub async fn create_session(&self, title: &str) -> Result<SessionSummary> {
        if self.is_streaming() {
            return Err(ChatError::TurnInFlight);
        }
        let summary = self.inner.persistence.create_session(title).await?;
        {
            let mut ctx = self.inner.context.borrow_mut();
            let mut session = Session::with_id(summary.id.clone());
            session.title = summary.title.clone();
            ctx.session = session;
        }
        self.inner.cache.borrow_mut().invalidate_sessions();
        self.inner.bus.emit(SessionEvent::SessionCreated {
            session_id: summary.id.clone(),
        });
        Ok(summary)
    }

    /// Switch to a persisted session and load its history.
    pub async fn open_session(&self, session_id: &str) -> Result<()> {
        if self.is_streaming() {
            return Err(ChatError::TurnInFlight);
        }
        let title = self
            .inner
            .cache
            .borrow()
            .sessions()
            .and_then(|list| list.iter().find(|s| s.id == session_id))
            .map(|s| s.title.clone());
        {
            let mut ctx = self.inner.context.borrow_mut();
            let mut session = Session::with_id(session_id);
            if let Some(title) = title {
                session.title = title;
            }
            ctx.session = session;
        }
        log::info!("Opened session {}", session_id);
        self.refresh_history().await.map(|_| ())
    }

    /// Fetch (or reuse cached) history and merge it into the session.
    /// Returns whether a merge happened.
    pub async fn refresh_history(&self) -> Result<bool> {
        let Some(session_id) = self.session_id() else {
            return Ok(false);
        };
        let fetched = self.fetch_conversation(&session_id).await?;
        Ok(self.inner.merge_history(&session_id, fetched))
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let cached = self.inner.cache.borrow().sessions().map(<[_]>::to_vec);
        if let Some(sessions) = cached {
            return Ok(sessions);
        }
        let sessions = self.inner.persistence.list_sessions().await?;
        self.inner.cache.borrow_mut().store_sessions(sessions.clone());
        Ok(sessions)
    }

    async fn fetch_conversation(&self, session_id: &str) -> Result<Vec<Message>> {
        let cached = self
            .inner
            .cache
            .borrow()
            .conversation(session_id)
            .map(<[_]>::to_vec);
        if let Some(messages) = cached {
            return Ok(messages);
        }
        let fetched = self.inner.persistence.fetch_history(session_id).await?;
        self.inner
            .cache
            .borrow_mut()
            .store_conversation(session_id, fetched.clone());
        Ok(fetched)
    }

    // ─── Feedback ────────────────────────────────────────────

    /// Rate a persisted message. Messages with temporary ids are rejected:
    /// the backend has nothing to attach the rating to yet.
    pub async fn submit_feedback(
        &self,
        message_id: &str,
        kind: FeedbackKind,
        comment: Option<String>,
    ) -> Result<()> {
        let feedback = {
            let ctx = self.inner.context.borrow();
            let message = ctx
                .session
                .find_by_raw_id(message_id)
                .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))?;
            if message.id.is_temporary() {
                return Err(ChatError::NotPersisted(message_id.to_string()));
            }
            let session_id = ctx
                .session
                .id
                .clone()
                .ok_or_else(|| ChatError::NotPersisted(message_id.to_string()))?;
            Feedback {
                session_id,
                message_id: message_id.to_string(),
                kind,
                comment,
            }
        };

        self.inner.persistence.submit_feedback(&feedback).await?;

        let id = MessageId::durable(message_id);
        if let Some(message) = self.inner.context.borrow_mut().session.message_mut(&id) {
            message.feedback = Some(kind);
        }
        self.inner.bus.emit(SessionEvent::MessageUpdated { message_id: id });
        Ok(())
    }

    // ─── Context persistence ─────────────────────────────────

    pub async fn save_context(&self, storage: &dyn StoragePort) -> Result<()> {
        let snapshot = self.inner.context.borrow().snapshot();
        snapshot.save(storage).await
    }

    /// Apply a saved context: its config, and its session if one was open.
    pub async fn resume(&self, saved: SavedContext) -> Result<()> {
        self.set_config(saved.config)?;
        match saved.session_id {
            Some(session_id) => self.open_session(&session_id).await,
            None => Ok(()),
        }
    }
}

impl Inner {
    fn handle_payload(&self, payload: &str) {
        let event = decode(payload);
        log::debug!("Stream event: {}", event.kind());
        let terminal = event.is_terminal();

        let applied = {
            let mut active = self.active.borrow_mut();
            match active.as_mut() {
                Some(turn) => {
                    let mut ctx = self.context.borrow_mut();
                    let effects = turn.machine.apply(&mut ctx.session, event);
                    Some((turn.machine.placeholder_id().clone(), effects))
                }
                None => None,
            }
        };
        match applied {
            Some((placeholder, effects)) => {
                self.perform(effects, &placeholder);
                if terminal {
                    self.release_stream();
                }
            }
            None => log::warn!("Stream event arrived with no active turn"),
        }
    }

    /// The backend may hold the connection open after `final` or `error`.
    /// Aborting runs the stream's on_done, which clears the turn.
    fn release_stream(&self) {
        let abort = self
            .active
            .borrow()
            .as_ref()
            .and_then(|turn| turn.abort.clone());
        if let Some(abort) = abort {
            abort.abort();
        }
    }

    /// Stream completion, whatever caused it.
    fn finish_turn(&self) {
        let Some(mut turn) = self.active.borrow_mut().take() else {
            return;
        };
        let effects = if turn.machine.is_terminated() {
            Vec::new()
        } else {
            log::warn!("Stream ended without a final or error event");
            let mut ctx = self.context.borrow_mut();
            let synthesize = ctx.config.synthesize_transport_errors;
            turn.machine.interrupt(&mut ctx.session, synthesize)
        };
        self.perform(effects, turn.machine.placeholder_id());
    }

    fn perform(&self, effects: Vec<TurnEffect>, placeholder: &MessageId) {
        for effect in effects {
            match effect {
                TurnEffect::MessageUpdated => self.bus.emit(SessionEvent::MessageUpdated {
                    message_id: placeholder.clone(),
                }),
                TurnEffect::SessionCreated { session_id } => {
                    self.bus.emit(SessionEvent::SessionCreated { session_id });
                }
                TurnEffect::InvalidateCaches { session_id } => {
                    self.cache.borrow_mut().invalidate_session(&session_id);
                    self.bus.emit(SessionEvent::CachesInvalidated { session_id });
                }
                TurnEffect::Finished(outcome) => {
                    log::info!("Turn ended: {:?}", outcome);
                    self.last_outcome.set(Some(outcome));
                    self.bus.emit(SessionEvent::TurnEnded {
                        message_id: placeholder.clone(),
                        outcome,
                    });
                }
            }
        }
    }

    fn merge_history(&self, session_id: &str, fetched: Vec<Message>) -> bool {
        let merged_count = {
            let mut ctx = self.context.borrow_mut();
            if ctx.session.id.as_deref() != Some(session_id) {
                log::debug!("Discarding history for {}: session switched", session_id);
                return false;
            }
            match reconcile(&ctx.session.messages, fetched) {
                Some(merged) => {
                    let count = merged.len();
                    ctx.session.messages = merged;
                    count
                }
                None => {
                    log::debug!("Skipping history merge while a turn is streaming");
                    return false;
                }
            }
        };
        self.bus.emit(SessionEvent::HistoryMerged {
            session_id: session_id.to_string(),
            message_count: merged_count,
        });
        true
    }
}
