//! Routing of inbound messages into the log, counters and notifications

use crate::chat_log::ChatLogStore;
use crate::contacts::Roster;
use crate::conversation::{ActiveConversation, ConversationKey};
use crate::events::{EventBus, SessionEvent};
use crate::messages::Message;
use crate::notifications::{Notification, NotificationQueue};
use crate::recent::RecentContacts;
use crate::unread::UnreadTracker;
use std::sync::Arc;
use tracing::debug;

/// What ingesting one message did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub logged: bool,
    pub contact_known: bool,
    /// New unread count, if the counter was bumped
    pub unread: Option<u32>,
    pub notified: bool,
}

#[derive(Clone)]
pub struct MessageIngestionPipeline {
    chat_log: Arc<ChatLogStore>,
    unread: Arc<UnreadTracker>,
    recent: Arc<RecentContacts>,
    roster: Arc<dyn Roster>,
    active: ActiveConversation,
    notifications: Arc<NotificationQueue>,
    events: EventBus,
}

impl MessageIngestionPipeline {
    pub fn new(
        chat_log: Arc<ChatLogStore>,
        unread: Arc<UnreadTracker>,
        recent: Arc<RecentContacts>,
        roster: Arc<dyn Roster>,
        active: ActiveConversation,
        notifications: Arc<NotificationQueue>,
        events: EventBus,
    ) -> Self {
        Self {
            chat_log,
            unread,
            recent,
            roster,
            active,
            notifications,
            events,
        }
    }

    pub fn ingest(&self, message: Message) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        if message.has_body() {
            self.record(&message, &mut outcome);
        }

        self.events.publish(SessionEvent::MessageReceived(message));
        outcome
    }

    fn record(&self, message: &Message, outcome: &mut IngestOutcome) {
        let key = message.conversation_key();
        self.chat_log.append(&key, message.clone());
        outcome.logged = true;

        let Some(contact) = self.roster.lookup(&key) else {
            debug!(conversation = %key, "Message from unknown contact, logged only");
            return;
        };
        outcome.contact_known = true;

        self.recent.touch(&contact);

        if !self.active.is_open(&key) {
            let count = self.unread.increment(&key);
            contact.set_unread_count(count);
            outcome.unread = Some(count);
        }

        if !message.is_offline() {
            if let Some(body) = message.body() {
                self.notifications
                    .enqueue(Notification::message(contact.display_name(), body, key));
                outcome.notified = true;
            }
        }
    }

    /// Notification title for a conversation
    pub fn title_for(&self, key: &ConversationKey) -> String {
        self.roster
            .lookup(key)
            .map(|c| c.display_name())
            .unwrap_or_else(|| key.to_string())
    }
}
