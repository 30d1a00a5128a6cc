//! Conversation identifiers and the "currently open" pointer

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Bare contact identifier, with any `/resource` suffix stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Derive the key from a sender address such as `alice@example.com/phone`
    pub fn from_address(address: &str) -> Self {
        let bare = match address.find('/') {
            Some(idx) => &address[..idx],
            None => address,
        };
        Self(bare.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationKey {
    fn from(address: &str) -> Self {
        Self::from_address(address)
    }
}

/// The conversation the UI currently has open, if any.
///
/// Cloning shares the pointer; the UI layer writes it, the core only reads.
#[derive(Debug, Clone, Default)]
pub struct ActiveConversation(Arc<RwLock<Option<ConversationKey>>>);

impl ActiveConversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, address: &str) {
        *self.0.write() = Some(ConversationKey::from_address(address));
    }

    pub fn close(&self) {
        *self.0.write() = None;
    }

    pub fn current(&self) -> Option<ConversationKey> {
        self.0.read().clone()
    }

    pub fn is_open(&self, key: &ConversationKey) -> bool {
        self.0.read().as_ref() == Some(key)
    }
}
