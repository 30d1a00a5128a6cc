//! Credential storage collaborator

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// Named values kept in the installation's encrypted store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSlot {
    Username,
    /// Long-lived secret used to obtain tokens
    Auth,
    Token,
    RootUrl,
    /// Key material for push registration, fetched once per installation
    ClientKey,
}

impl fmt::Display for CredentialSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSlot::Username => write!(f, "username"),
            CredentialSlot::Auth => write!(f, "auth"),
            CredentialSlot::Token => write!(f, "token"),
            CredentialSlot::RootUrl => write!(f, "root_url"),
            CredentialSlot::ClientKey => write!(f, "client_key"),
        }
    }
}

/// Encrypted put/get/remove, scoped to the local installation
pub trait CredentialStore: Send + Sync {
    fn get(&self, slot: CredentialSlot) -> Option<String>;

    fn put(&self, slot: CredentialSlot, value: &str);

    fn remove(&self, slot: CredentialSlot);

    fn clear(&self);

    fn contains(&self, slot: CredentialSlot) -> bool {
        self.get(slot).is_some()
    }
}

/// Unencrypted store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<CredentialSlot, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a username and long-lived secret
    pub fn with_login(username: &str, secret: &str) -> Self {
        let store = Self::new();
        store.put(CredentialSlot::Username, username);
        store.put(CredentialSlot::Auth, secret);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, slot: CredentialSlot) -> Option<String> {
        self.values.lock().get(&slot).cloned()
    }

    fn put(&self, slot: CredentialSlot, value: &str) {
        self.values.lock().insert(slot, value.to_string());
    }

    fn remove(&self, slot: CredentialSlot) {
        self.values.lock().remove(&slot);
    }

    fn clear(&self) {
        self.values.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryCredentialStore::new();
        assert!(!store.contains(CredentialSlot::Token));

        store.put(CredentialSlot::Token, "t1");
        assert_eq!(store.get(CredentialSlot::Token).as_deref(), Some("t1"));

        store.remove(CredentialSlot::Token);
        assert!(store.get(CredentialSlot::Token).is_none());
        // removing twice is fine
        store.remove(CredentialSlot::Token);
    }

    #[test]
    fn test_with_login() {
        let store = MemoryCredentialStore::with_login("me@x.com", "secret");
        assert_eq!(store.get(CredentialSlot::Username).as_deref(), Some("me@x.com"));
        assert_eq!(store.get(CredentialSlot::Auth).as_deref(), Some("secret"));

        store.clear();
        assert!(!store.contains(CredentialSlot::Auth));
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(CredentialSlot::ClientKey.to_string(), "client_key");
    }
}
