//! Persistent key-value store adapter.
//!
//! Wraps the browser's per-origin storage behind an object-safe trait so the
//! ledgers can run (and be tested) off-browser against an in-memory map.
//! Values are JSON-encoded; unreadable or corrupt entries are treated as
//! absent and never propagated to callers.

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;

/// Well-known storage keys shared with the original backend layout.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const DARK_MODE: &str = "darkMode";
    pub const LEGACY_THEME: &str = "futuristcards_theme";
    pub const LANGUAGE: &str = "language";
    pub const CARDS_STATS: &str = "cardsStats";
    pub const GLOBAL_STATS: &str = "globalStats";
    pub const STATS_BROADCAST: &str = "cardsStats_update";
    pub const FAVORITES_PREFIX: &str = "favorites_";
}

/// Minimal storage surface: raw string get/set/remove.
///
/// Implementations must tolerate failure (quota, disabled storage) by
/// degrading to no-ops; callers never see storage errors.
pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Read and decode a JSON value, treating corrupt entries as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get_raw(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("discarding corrupt value under '{}': {}", key, err);
            None
        }
    }
}

/// Encode and write a JSON value. Encoding failures are logged and dropped.
pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set_raw(key, &raw),
        Err(err) => warn!("failed to encode value for '{}': {}", key, err),
    }
}

/// In-memory store used on native targets and in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// `window.localStorage` adapter. Storage being unavailable (private mode,
/// disabled cookies) degrades every operation to a no-op.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
pub struct BrowserStore;

#[cfg(target_arch = "wasm32")]
impl BrowserStore {
    pub fn new() -> Self {
        Self
    }

    fn local_storage(&self) -> Option<web_sys::Storage> {
        match gloo_utils::window().local_storage() {
            Ok(storage) => storage,
            Err(_) => {
                warn!("localStorage is unavailable");
                None
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.local_storage()?.get_item(key).ok().flatten()
    }

    fn set_raw(&self, key: &str, value: &str) {
        if let Some(storage) = self.local_storage() {
            if storage.set_item(key, value).is_err() {
                warn!("failed to persist '{}'", key);
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}
