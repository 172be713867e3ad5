//! Pick the storage backend named by the configuration.
//!
//! `Auto` prefers localStorage and falls back to memory.

use std::rc::Rc;
use chat_core::ports::StoragePort;
use chat_types::config::{StorageBackendType, StorageConfig};
use super::{LocalStorage, MemoryStorage};

/// Returns a trait object so callers are backend-agnostic.
/// Never fails: an unavailable backend degrades to memory.
pub fn open_storage(config: &StorageConfig) -> Rc<dyn StoragePort> {
    match config.backend {
        StorageBackendType::Memory => Rc::new(MemoryStorage::new()),
        StorageBackendType::LocalStorage | StorageBackendType::Auto => match LocalStorage::open() {
            Ok(local) => {
                log::info!("Storage backend: localStorage");
                Rc::new(local)
            }
            Err(e) => {
                log::warn!("localStorage unavailable ({}), falling back to memory", e);
                Rc::new(MemoryStorage::new())
            }
        },
    }
}
