//! Per-conversation unread counters

use crate::conversation::ConversationKey;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Unread counts. The core only increments and reads; resetting a counter
/// when a conversation is opened is up to the UI layer.
#[derive(Debug, Default)]
pub struct UnreadTracker {
    counts: DashMap<ConversationKey, u32>,
}

impl UnreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the counter for `key`, returning the new value
    pub fn increment(&self, key: &ConversationKey) -> u32 {
        let mut count = self.counts.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn count(&self, key: &ConversationKey) -> u32 {
        self.counts.get(key).map(|c| *c).unwrap_or(0)
    }

    /// Drop the counter for `key`, returning what it was
    pub fn reset(&self, key: &ConversationKey) -> u32 {
        self.counts.remove(key).map(|(_, c)| c).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| u64::from(*c.value())).sum()
    }

    pub fn clear(&self) {
        self.counts.clear();
    }

    pub fn export(&self) -> BTreeMap<ConversationKey, u32> {
        self.counts
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub fn import(&self, counts: BTreeMap<ConversationKey, u32>) {
        self.counts.clear();
        for (key, count) in counts {
            if count > 0 {
                self.counts.insert(key, count);
            }
        }
    }
}
