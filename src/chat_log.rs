//! Bounded per-conversation message history

use crate::conversation::ConversationKey;
use crate::messages::Message;
use dashmap::DashMap;
use std::collections::{BTreeMap, VecDeque};

/// Chat history per conversation, capped at `capacity` messages each.
///
/// Locking is sharded per key, so appends to different conversations do not
/// contend.
#[derive(Debug)]
pub struct ChatLogStore {
    capacity: usize,
    logs: DashMap<ConversationKey, VecDeque<Message>>,
}

impl ChatLogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            logs: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, evicting the oldest entries once the cap is reached
    pub fn append(&self, key: &ConversationKey, message: Message) {
        let mut log = self.logs.entry(key.clone()).or_default();
        while log.len() >= self.capacity {
            log.pop_front();
        }
        log.push_back(message);
    }

    /// Copy of the history for `key`, oldest first
    pub fn history(&self, key: &ConversationKey) -> Vec<Message> {
        self.logs
            .get(key)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, key: &ConversationKey) -> usize {
        self.logs.get(key).map(|log| log.len()).unwrap_or(0)
    }

    pub fn conversations(&self) -> Vec<ConversationKey> {
        let mut keys: Vec<_> = self.logs.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn clear(&self) {
        self.logs.clear();
    }

    pub fn export(&self) -> BTreeMap<ConversationKey, Vec<Message>> {
        self.logs
            .iter()
            .map(|e| (e.key().clone(), e.value().iter().cloned().collect()))
            .collect()
    }

    /// Replace the current contents; overlong logs keep their newest entries
    pub fn import(&self, logs: BTreeMap<ConversationKey, Vec<Message>>) {
        self.logs.clear();
        for (key, messages) in logs {
            let skip = messages.len().saturating_sub(self.capacity);
            self.logs
                .insert(key, messages.into_iter().skip(skip).collect());
        }
    }
}
