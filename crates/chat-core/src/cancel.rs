//! Cancellation shared by the stream pump, the transport and the controller.
//!
//! An [`AbortHandle`] is a single-threaded flag with hooks. Transports
//! register a hook that tears down their connection; the pump races every
//! read against [`AbortHandle::aborted`]. Aborting is idempotent.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

use chat_types::message::Message;

/// Content given to a stopped message that never received any text.
pub const STOPPED_PLACEHOLDER: &str = "(stopped)";

/// Resolves once the handle that produced it is aborted.
pub type Aborted = Shared<oneshot::Receiver<()>>;

/// Clone-cheap abort signal via Rc.
#[derive(Clone)]
pub struct AbortHandle {
    inner: Rc<AbortInner>,
}

struct AbortInner {
    aborted: Cell<bool>,
    hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
    signal: RefCell<Option<oneshot::Sender<()>>>,
    aborted_rx: Aborted,
}

impl Default for AbortHandle {
    fn default() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            inner: Rc::new(AbortInner {
                aborted: Cell::new(false),
                hooks: RefCell::new(Vec::new()),
                signal: RefCell::new(Some(tx)),
                aborted_rx: rx.shared(),
            }),
        }
    }
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.get()
    }

    /// Abort. Runs every registered hook once, then resolves every
    /// [`Aborted`] future. Returns `false` if already aborted.
    pub fn abort(&self) -> bool {
        if self.inner.aborted.replace(true) {
            return false;
        }
        // Hooks may call back into this handle; release the borrow first.
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
        if let Some(signal) = self.inner.signal.borrow_mut().take() {
            let _ = signal.send(());
        }
        true
    }

    /// Run `hook` when the handle is aborted, or right away if it already is.
    pub fn on_abort(&self, hook: impl FnOnce() + 'static) {
        if self.is_aborted() {
            hook();
        } else {
            self.inner.hooks.borrow_mut().push(Box::new(hook));
        }
    }

    pub fn aborted(&self) -> Aborted {
        self.inner.aborted_rx.clone()
    }
}

/// Close a message after a client-initiated stop.
///
/// Partial content is kept; an empty message gets [`STOPPED_PLACEHOLDER`].
/// Returns `false` if the message was not streaming.
pub fn stop_message(message: &mut Message) -> bool {
    if !message.is_streaming {
        return false;
    }
    if message.content.is_empty() {
        message.content = STOPPED_PLACEHOLDER.to_string();
    }
    message.is_streaming = false;
    true
}
