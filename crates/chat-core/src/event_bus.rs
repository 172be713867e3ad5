//! Session notifications for whatever renders the conversation.
//!
//! Single-threaded (WASM constraint), interior mutability via RefCell.
//! The view drains the queue when it redraws. Every answer chunk updates
//! the streaming message, so back-to-back `MessageUpdated` for one message
//! are queued once.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use chat_types::event::SessionEvent;

/// Clone-cheap via Rc; clones share one queue.
#[derive(Clone, Default)]
pub struct EventBus {
    queue: Rc<RefCell<VecDeque<SessionEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SessionEvent) {
        let mut queue = self.queue.borrow_mut();
        let repeated = matches!(event, SessionEvent::MessageUpdated { .. })
            && queue.back() == Some(&event);
        if !repeated {
            queue.push_back(event);
        }
    }

    /// All pending events, oldest first.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }
}
