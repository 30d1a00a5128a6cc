//! "Seen recently" contact list

use crate::contacts::Contact;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Most-recently-active contacts, newest first.
///
/// Entries are weak: a contact dropped from the roster leaves a stale slot
/// that is discarded the next time the list is scanned.
#[derive(Debug)]
pub struct RecentContacts {
    capacity: usize,
    entries: Mutex<Vec<Weak<Contact>>>,
}

impl RecentContacts {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Move `contact` to the front, dropping the oldest entry if full
    pub fn touch(&self, contact: &Arc<Contact>) {
        let mut entries = self.entries.lock();
        let mut found = false;

        let mut i = 0;
        while i < entries.len() {
            match entries[i].upgrade() {
                None => {
                    entries.remove(i);
                }
                Some(existing) if existing.key() == contact.key() => {
                    entries.remove(i);
                    found = true;
                    break;
                }
                Some(_) => i += 1,
            }
        }

        if !found {
            entries.truncate(self.capacity - 1);
        }

        entries.insert(0, Arc::downgrade(contact));
    }

    /// Live contacts, newest first
    pub fn contacts(&self) -> Vec<Arc<Contact>> {
        self.entries.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Number of slots, stale ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
