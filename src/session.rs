//! Session projection: the named slots the authentication state machine
//! reads and writes on the host's per-browser session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Slot that remembers where to send the user after a CAS login.
pub const RETURN_TO_SLOT: &str = "cas_return_to";

/// Returned by [`SessionSlots::destroy`] when the host session cannot be
/// destroyed as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session destruction is not supported")]
pub struct DestroyUnsupported;

/// Read/write access to a host session's named slots.
///
/// Implement this for your framework's session type. Only
/// [`destroy`](SessionSlots::destroy) is optional; the default reports it as
/// unsupported, and logout then clears the principal slot instead.
pub trait SessionSlots {
    fn get(&self, key: &str) -> Option<&Value>;

    fn insert(&mut self, key: &str, value: Value);

    fn remove(&mut self, key: &str) -> Option<Value>;

    /// Destroy the whole session.
    ///
    /// # Errors
    ///
    /// Returns [`DestroyUnsupported`] when the session cannot be destroyed.
    fn destroy(&mut self) -> Result<(), DestroyUnsupported> {
        Err(DestroyUnsupported)
    }

    /// String value of a slot; non-string values read as absent.
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// In-process session: a map of slots plus a destroyed flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySession {
    slots: HashMap<String, Value>,
    #[serde(skip)]
    destroyed: bool,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`destroy`](SessionSlots::destroy) was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SessionSlots for MemorySession {
    fn get(&self, key: &str) -> Option<&Value> {
        self.slots.get(key)
    }

    fn insert(&mut self, key: &str, value: Value) {
        self.slots.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.slots.remove(key)
    }

    fn destroy(&mut self) -> Result<(), DestroyUnsupported> {
        self.slots.clear();
        self.destroyed = true;
        Ok(())
    }
}
