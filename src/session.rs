//! Chat session management
//!
//! Wires the readiness gate, registration, login, ingestion and notification
//! components together behind one handle.

use crate::chat_log::ChatLogStore;
use crate::config::{Config, MESSAGE_PARSING_TITLE};
use crate::contacts::{Contact, Roster};
use crate::context::SessionContext;
use crate::conversation::{ActiveConversation, ConversationKey};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::events::{EventBus, EventReceiver, LoginPrompt, SessionEvent};
use crate::failure::Operation;
use crate::gate::{ReadinessGate, ReadinessState};
use crate::login::{LoginFlow, LoginQueue};
use crate::messages::Message;
use crate::notifications::{Notification, NotificationQueue, Presenter};
use crate::offline::{OfflineSyncAggregator, OfflineSyncReport};
use crate::pipeline::MessageIngestionPipeline;
use crate::recent::RecentContacts;
use crate::registration::{RegistrationPhase, RegistrationProtocol};
use crate::relogin::ReLoginFlow;
use crate::roster_sync::RosterSync;
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::transport::{PinnedConversations, Transport};
use crate::unread::UnreadTracker;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Prefix of raw push payloads that carry a chat message
const MESSAGE_PAYLOAD_PREFIX: &str = "msg:";

/// External collaborators a session is built from
pub struct SessionCollaborators {
    pub transport: Arc<dyn Transport>,
    pub credentials: Arc<dyn CredentialStore>,
    pub roster: Arc<dyn Roster>,
    pub presenter: Arc<dyn Presenter>,
    pub pinned: Arc<dyn PinnedConversations>,
}

/// Client-side chat session. Must be created inside a tokio runtime; network
/// work is spawned on it.
pub struct Session {
    pub(crate) ctx: SessionContext,
    roster: Arc<dyn Roster>,
    pub(crate) chat_log: Arc<ChatLogStore>,
    pub(crate) unread: Arc<UnreadTracker>,
    recent: Arc<RecentContacts>,
    active: ActiveConversation,
    notifications: Arc<NotificationQueue>,
    gate: Arc<ReadinessGate>,
    login_queue: LoginQueue,
    pub(crate) registration: RegistrationProtocol,
    pub(crate) roster_sync: RosterSync,
    pub(crate) pipeline: MessageIngestionPipeline,
    pub(crate) offline: OfflineSyncAggregator,
    snapshots: SnapshotStore,
    login_driver: JoinHandle<()>,
}

impl Session {
    pub fn new(config: Config, collaborators: SessionCollaborators) -> Result<Self> {
        let SessionCollaborators {
            transport,
            credentials,
            roster,
            presenter,
            pinned,
        } = collaborators;

        let events = EventBus::new(config.event_capacity);
        let ctx = SessionContext::new(transport, credentials, events.clone())?;

        let chat_log = Arc::new(ChatLogStore::new(config.chat_log_capacity));
        let unread = Arc::new(UnreadTracker::new());
        let recent = Arc::new(RecentContacts::new(config.recent_contacts_capacity));
        let active = ActiveConversation::new();
        let notifications = NotificationQueue::new(presenter, events.clone());

        let login_queue = LoginQueue::new();
        let relogin = ReLoginFlow::new(ctx.clone(), login_queue.clone());
        let pipeline = MessageIngestionPipeline::new(
            chat_log.clone(),
            unread.clone(),
            recent.clone(),
            roster.clone(),
            active.clone(),
            notifications.clone(),
            events,
        );
        let offline = OfflineSyncAggregator::new(
            ctx.clone(),
            pipeline.clone(),
            active.clone(),
            notifications.clone(),
            relogin.clone(),
        );
        let roster_sync = RosterSync::new(
            ctx.clone(),
            roster.clone(),
            unread.clone(),
            offline.clone(),
            relogin.clone(),
        );
        let registration =
            RegistrationProtocol::new(ctx.clone(), pinned, relogin, roster_sync.clone());
        let gate = Arc::new(ReadinessGate::new(
            ctx.readiness.clone(),
            Arc::new(registration.clone()),
        ));

        let login = LoginFlow::new(ctx.clone(), gate.clone(), login_queue.clone());
        let login_driver = ctx.runtime.spawn(login.run());

        Ok(Self {
            ctx,
            roster,
            chat_log,
            unread,
            recent,
            active,
            notifications,
            gate,
            login_queue,
            registration,
            roster_sync,
            pipeline,
            offline,
            snapshots: SnapshotStore::new(&config),
            login_driver,
        })
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.ctx.events.subscribe()
    }

    /// Queue a login pass; bursts collapse into one
    pub fn login_if_needed(&self) {
        self.login_queue.request();
    }

    /// The push channel produced a (possibly new) delivery address
    pub fn notify_delivery_address_ready(&self, address: &str) {
        self.gate.notify_delivery_address_ready(address);
    }

    pub fn notify_token_ready(&self) {
        self.gate.notify_token_ready();
    }

    pub fn readiness(&self) -> ReadinessState {
        self.gate.state()
    }

    /// Handle a raw push payload. Only `msg:` payloads are acted on.
    pub fn raw_notification_received(&self, data: &str) {
        let Some(payload) = data.strip_prefix(MESSAGE_PAYLOAD_PREFIX) else {
            debug!(len = data.len(), "Ignoring raw notification");
            return;
        };

        let payload = payload.to_string();
        let generation = self.ctx.epoch.current();
        let epoch = self.ctx.epoch.clone();
        let transport = self.ctx.transport.clone();
        let pipeline = self.pipeline.clone();
        let notifications = self.notifications.clone();

        self.ctx.runtime.spawn(async move {
            let parsed = transport.parse_message(&payload).await;
            if !epoch.is_current(generation) {
                debug!("Dropping push message parsed for a stale session");
                return;
            }
            match parsed {
                Ok(message) => {
                    pipeline.ingest(message);
                }
                Err(e) => {
                    let err = Error::remote(Operation::ParseMessage, e);
                    warn!(error = %err, "Dropping unparseable push message");
                    notifications.enqueue(Notification::alert(
                        err.user_message(),
                        Some(MESSAGE_PARSING_TITLE),
                    ));
                }
            }
        });
    }

    /// Ingest a message delivered by some other path
    pub fn message_received(&self, message: Message) {
        self.pipeline.ingest(message);
    }

    /// Drain the offline backlog in the background; `on_done` runs exactly
    /// once, whether the drain succeeded or not.
    pub fn sync_offline_messages<F>(&self, on_done: F)
    where
        F: FnOnce(OfflineSyncReport) + Send + 'static,
    {
        self.offline.spawn(on_done);
    }

    /// Show a titled alert through the notification queue
    pub fn show_alert(&self, message: &str, title: Option<&str>) {
        self.notifications.enqueue(Notification::alert(message, title));
    }

    /// Point the session at the conversation the UI has open
    pub fn set_current_conversation(&self, address: Option<&str>) {
        match address {
            Some(address) => self.active.open(address),
            None => self.active.close(),
        }
    }

    pub fn active_conversation(&self) -> ActiveConversation {
        self.active.clone()
    }

    pub fn chat_log(&self, address: &str) -> Vec<Message> {
        self.chat_log.history(&ConversationKey::from_address(address))
    }

    pub fn unread_count(&self, address: &str) -> u32 {
        self.unread.count(&ConversationKey::from_address(address))
    }

    /// Clear the unread counter for a conversation the user has read
    pub fn reset_unread(&self, address: &str) {
        let key = ConversationKey::from_address(address);
        self.unread.reset(&key);
        if let Some(contact) = self.roster.lookup(&key) {
            contact.set_unread_count(0);
        }
    }

    pub fn recent_contacts(&self) -> Vec<Arc<Contact>> {
        self.recent.contacts()
    }

    pub fn registration_phase(&self) -> RegistrationPhase {
        self.registration.phase()
    }

    /// Download the roster again, outside the registration flow
    pub async fn reload_roster(&self) {
        self.roster_sync.load().await;
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.flags.is_connected()
    }

    pub fn is_roster_loaded(&self) -> bool {
        self.ctx.flags.is_roster_loaded()
    }

    /// Forget everything about the signed-in user
    pub async fn logout(&self) {
        info!("Logging out");
        self.ctx.flags.reset();
        self.ctx.credentials.clear();
        self.chat_log.clear();
        self.unread.clear();
        self.recent.clear();
        self.roster.clear();
        *self.ctx.readiness.lock() = ReadinessState::default();
        self.ctx.epoch.advance();
        self.registration.reset();

        let transport = &self.ctx.transport;
        if transport.is_logged_in() {
            if let Err(e) = transport.logout().await {
                debug!(error = %e, "Backend logout failed");
            }
        }

        self.ctx.events.publish(SessionEvent::LoggedOut);
        self.ctx
            .events
            .publish(SessionEvent::LoginRequired(LoginPrompt::NoCredentials));
    }

    /// Current chat logs and unread counts
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            chat_log: self.chat_log.export(),
            unread: self.unread.export(),
            saved_at: Some(Utc::now()),
        }
    }

    pub fn save_snapshot(&self) -> Result<()> {
        let snapshot = self.snapshot();
        self.snapshots.save(&snapshot)?;
        debug!(
            path = %self.snapshots.path().display(),
            conversations = snapshot.chat_log.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    /// Replace chat logs and unread counts with the saved snapshot.
    /// Returns the number of conversations restored.
    pub fn restore_snapshot(&self) -> Result<usize> {
        let snapshot = self.snapshots.load()?;
        let conversations = snapshot.conversations();

        self.chat_log.import(snapshot.chat_log);
        self.unread.import(snapshot.unread);
        for key in &conversations {
            if let Some(contact) = self.roster.lookup(key) {
                contact.set_unread_count(self.unread.count(key));
            }
        }

        info!(conversations = conversations.len(), "Snapshot restored");
        Ok(conversations.len())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.login_driver.abort();
    }
}
