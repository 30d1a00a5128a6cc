//! Roster download, run once a registration succeeds

use crate::config::{CONTACT_LIST_MESSAGE, CONTACT_LIST_TITLE};
use crate::contacts::{Contact, Roster, RosterEntry};
use crate::context::SessionContext;
use crate::conversation::ConversationKey;
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::failure::{Failure, Operation};
use crate::offline::OfflineSyncAggregator;
use crate::relogin::ReLoginFlow;
use crate::unread::UnreadTracker;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct RosterSync {
    ctx: SessionContext,
    roster: Arc<dyn Roster>,
    unread: Arc<UnreadTracker>,
    offline: OfflineSyncAggregator,
    relogin: ReLoginFlow,
}

impl RosterSync {
    pub fn new(
        ctx: SessionContext,
        roster: Arc<dyn Roster>,
        unread: Arc<UnreadTracker>,
        offline: OfflineSyncAggregator,
        relogin: ReLoginFlow,
    ) -> Self {
        Self {
            ctx,
            roster,
            unread,
            offline,
            relogin,
        }
    }

    /// Download and merge the roster. The first load of a session also
    /// drains the offline backlog.
    pub async fn load(&self) {
        match self.fetch_and_merge().await {
            Ok(added) => {
                info!(added, total = self.roster.len(), "Roster loaded");
                self.ctx.flags.set_roster_loaded(true);
                self.ctx.events.publish(SessionEvent::RosterUpdated);

                if self.ctx.flags.claim_offline_fetch() {
                    self.offline.drain().await;
                }
            }
            Err(e) => self.report_failure(e),
        }
    }

    /// Returns how many contacts were new
    async fn fetch_and_merge(&self) -> Result<usize> {
        let generation = self.ctx.epoch.current();
        let entries = self
            .ctx
            .transport
            .fetch_roster()
            .await
            .map_err(|e| Error::remote(Operation::LoadRoster, e))?;
        self.ctx.ensure_current(generation)?;

        Ok(self.merge(entries))
    }

    fn merge(&self, entries: Vec<RosterEntry>) -> usize {
        let mut added = 0;

        for entry in entries {
            let key = ConversationKey::from_address(&entry.address);
            match self.roster.lookup(&key) {
                Some(existing) => {
                    if entry.name.is_some() {
                        existing.set_name(entry.name);
                    }
                }
                None => {
                    let contact = Contact::new(key, entry.name);
                    contact.set_unread_count(self.unread.count(contact.key()));
                    self.roster.insert(Arc::new(contact));
                    added += 1;
                }
            }
        }

        added
    }

    fn report_failure(&self, err: Error) {
        let Some(failure) = err.failure() else {
            debug!(error = %err, "Roster load dropped");
            return;
        };

        warn!(error = %err, "Roster load failed");
        match failure {
            Failure::ConnectivityFailure => self
                .ctx
                .events
                .connect_failed(CONTACT_LIST_MESSAGE, CONTACT_LIST_TITLE),
            Failure::AuthExpired => self.relogin.invoke(),
            _ => self
                .ctx
                .events
                .connect_failed(err.user_message(), CONTACT_LIST_TITLE),
        }
    }
}
