use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// In-memory `session id -> wallet address` bindings.
///
/// Owned by the dispatcher; bindings live for the lifetime of the process. Addresses are stored
/// lowercased. Rebinding a session overwrites the previous address.
#[derive(Debug, Default)]
pub struct SessionWalletRegistry {
    bindings: RwLock<HashMap<String, String>>,
}

impl SessionWalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the address previously bound to the session, if any.
    pub fn bind(&self, session_id: &str, address: &str) -> Option<String> {
        let mut g = self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        g.insert(session_id.to_owned(), address.to_ascii_lowercase())
    }

    pub fn resolve(&self, session_id: &str) -> Option<String> {
        let g = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        g.get(session_id).cloned()
    }

    pub fn bound_sessions(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
