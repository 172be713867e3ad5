//! Chat App — WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles the browser adapters around a `ChatController` and hands
//! the result to JavaScript as [`ChatClient`].

mod client;

pub use client::ChatClient;

use wasm_bindgen::prelude::*;

/// WASM entry point — runs when the module is instantiated
#[wasm_bindgen(start)]
pub fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Chat client WASM starting...");
}
