//! Streaming chat session core.
//!
//! Frames and decodes the response stream of a turn, folds it into the
//! session, merges persisted history and handles cancellation. Platform
//! code plugs in through the traits in [`ports`].

pub mod cancel;
pub mod ports;
pub mod framer;
pub mod decoder;
pub mod turn;
pub mod reconcile;
pub mod cache;
pub mod event_bus;
pub mod context;
pub mod controller;


pub use cancel::AbortHandle;
pub use controller::ChatController;
pub use event_bus::EventBus;
