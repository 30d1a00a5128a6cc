//! Contacts and the roster collaborator

use crate::conversation::ConversationKey;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A roster contact. The UI observes `name` and `unread_count`.
#[derive(Debug)]
pub struct Contact {
    key: ConversationKey,
    name: RwLock<Option<String>>,
    unread: AtomicU32,
}

impl Contact {
    pub fn new(key: ConversationKey, name: Option<String>) -> Self {
        Self {
            key,
            name: RwLock::new(name),
            unread: AtomicU32::new(0),
        }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: Option<String>) {
        *self.name.write() = name;
    }

    /// Name if known, otherwise the bare address
    pub fn display_name(&self) -> String {
        match self.name.read().as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.key.to_string(),
        }
    }

    pub fn unread_count(&self) -> u32 {
        self.unread.load(Ordering::Acquire)
    }

    pub fn set_unread_count(&self, count: u32) {
        self.unread.store(count, Ordering::Release);
    }
}

/// One entry of a roster download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub address: String,
    pub name: Option<String>,
}

impl RosterEntry {
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }
}

/// Known contacts, keyed by conversation.
///
/// Implementations backing UI state are responsible for marshaling changes
/// onto the UI thread.
pub trait Roster: Send + Sync {
    fn lookup(&self, key: &ConversationKey) -> Option<Arc<Contact>>;

    fn insert(&self, contact: Arc<Contact>);

    fn remove(&self, key: &ConversationKey) -> Option<Arc<Contact>>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory roster
#[derive(Debug, Default)]
pub struct MemoryRoster {
    contacts: DashMap<ConversationKey, Arc<Contact>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contacts(&self) -> Vec<Arc<Contact>> {
        self.contacts.iter().map(|e| e.value().clone()).collect()
    }
}

impl Roster for MemoryRoster {
    fn lookup(&self, key: &ConversationKey) -> Option<Arc<Contact>> {
        self.contacts.get(key).map(|c| c.value().clone())
    }

    fn insert(&self, contact: Arc<Contact>) {
        self.contacts.insert(contact.key().clone(), contact);
    }

    fn remove(&self, key: &ConversationKey) -> Option<Arc<Contact>> {
        self.contacts.remove(key).map(|(_, c)| c)
    }

    fn clear(&self) {
        self.contacts.clear();
    }

    fn len(&self) -> usize {
        self.contacts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ConversationKey {
        ConversationKey::from_address(s)
    }

    #[test]
    fn test_display_name_falls_back_to_address() {
        let named = Contact::new(key("a@x.com"), Some("Alice".into()));
        assert_eq!(named.display_name(), "Alice");

        let unnamed = Contact::new(key("b@x.com"), None);
        assert_eq!(unnamed.display_name(), "b@x.com");

        let blank = Contact::new(key("c@x.com"), Some(String::new()));
        assert_eq!(blank.display_name(), "c@x.com");
    }

    #[test]
    fn test_contact_unread() {
        let contact = Contact::new(key("a@x.com"), None);
        assert_eq!(contact.unread_count(), 0);
        contact.set_unread_count(4);
        assert_eq!(contact.unread_count(), 4);
    }

    #[test]
    fn test_memory_roster() {
        let roster = MemoryRoster::new();
        assert!(roster.is_empty());

        roster.insert(Arc::new(Contact::new(key("a@x.com"), Some("Alice".into()))));
        assert_eq!(roster.len(), 1);

        let found = roster.lookup(&key("a@x.com/phone")).unwrap();
        assert_eq!(found.display_name(), "Alice");
        assert!(roster.lookup(&key("z@x.com")).is_none());

        assert!(roster.remove(&key("a@x.com")).is_some());
        assert!(roster.is_empty());
    }

    #[test]
    fn test_roster_lookup_shares_contact() {
        let roster = MemoryRoster::new();
        roster.insert(Arc::new(Contact::new(key("a@x.com"), None)));

        roster.lookup(&key("a@x.com")).unwrap().set_unread_count(2);
        assert_eq!(roster.lookup(&key("a@x.com")).unwrap().unread_count(), 2);
    }
}
