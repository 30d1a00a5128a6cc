//! Offline backlog drain with per-sender summaries

use crate::config::{offline_summary, OFFLINE_MESSAGES_MESSAGE, OFFLINE_MESSAGES_TITLE};
use crate::context::SessionContext;
use crate::conversation::{ActiveConversation, ConversationKey};
use crate::error::{Error, Result};
use crate::failure::{Failure, Operation};
use crate::messages::Message;
use crate::notifications::{Notification, NotificationQueue};
use crate::pipeline::MessageIngestionPipeline;
use crate::relogin::ReLoginFlow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Messages drained from one sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderSummary {
    pub conversation: ConversationKey,
    pub count: usize,
    pub first_body: Option<String>,
}

/// Result of one drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineSyncReport {
    pub received: usize,
    /// Senders in the order their first message arrived
    pub senders: Vec<SenderSummary>,
    pub notified: usize,
    pub failure: Option<Failure>,
}

#[derive(Debug, Default)]
struct SenderTally {
    index: HashMap<ConversationKey, usize>,
    senders: Vec<SenderSummary>,
}

impl SenderTally {
    fn record(&mut self, message: &Message) {
        let key = message.conversation_key();
        match self.index.get(&key) {
            Some(&i) => self.senders[i].count += 1,
            None => {
                self.index.insert(key.clone(), self.senders.len());
                self.senders.push(SenderSummary {
                    conversation: key,
                    count: 1,
                    first_body: message.body().map(str::to_string),
                });
            }
        }
    }
}

#[derive(Clone)]
pub struct OfflineSyncAggregator {
    ctx: SessionContext,
    pipeline: MessageIngestionPipeline,
    active: ActiveConversation,
    notifications: Arc<NotificationQueue>,
    relogin: ReLoginFlow,
}

impl OfflineSyncAggregator {
    pub fn new(
        ctx: SessionContext,
        pipeline: MessageIngestionPipeline,
        active: ActiveConversation,
        notifications: Arc<NotificationQueue>,
        relogin: ReLoginFlow,
    ) -> Self {
        Self {
            ctx,
            pipeline,
            active,
            notifications,
            relogin,
        }
    }

    /// Drain the backlog, ingest every message and summarise per sender.
    /// Always resolves, with the failure recorded in the report.
    pub async fn drain(&self) -> OfflineSyncReport {
        let generation = self.ctx.epoch.current();
        let mut tally = SenderTally::default();
        let mut received = 0;

        let result = {
            let pipeline = &self.pipeline;
            let epoch = &self.ctx.epoch;
            let mut on_each = |message: Message| {
                if !epoch.is_current(generation) {
                    debug!(from = message.from(), "Dropping offline message from a stale session");
                    return;
                }
                let message = message.into_offline();
                tally.record(&message);
                received += 1;
                pipeline.ingest(message);
            };
            self.ctx
                .transport
                .drain_queued_messages(&mut on_each)
                .await
                .map_err(|e| Error::remote(Operation::OfflineSync, e))
        };

        let mut report = OfflineSyncReport {
            received,
            senders: tally.senders,
            ..Default::default()
        };

        if let Err(err) = result.and_then(|()| self.ctx.ensure_current(generation)) {
            report.failure = err.failure();
            self.report_failure(err);
            return report;
        }

        info!(
            received = report.received,
            senders = report.senders.len(),
            "Offline messages drained"
        );
        report.notified = self.summarise(&report.senders);
        report
    }

    fn summarise(&self, senders: &[SenderSummary]) -> usize {
        let mut notified = 0;

        for sender in senders {
            if self.active.is_open(&sender.conversation) {
                continue;
            }

            let body = match (sender.count, sender.first_body.as_deref()) {
                (1, Some(body)) if !body.is_empty() => body.to_string(),
                (1, _) => continue,
                (count, _) => offline_summary(count),
            };

            debug!(conversation = %sender.conversation, count = sender.count, "Offline summary");
            let title = self.pipeline.title_for(&sender.conversation);
            self.notifications.enqueue(Notification::message(
                title,
                body,
                sender.conversation.clone(),
            ));
            notified += 1;
        }

        notified
    }

    fn report_failure(&self, err: Error) {
        let Some(failure) = err.failure() else {
            debug!(error = %err, "Offline drain dropped");
            return;
        };

        warn!(error = %err, "Offline drain failed");
        match failure {
            Failure::ConnectivityFailure => self
                .notifications
                .enqueue(Notification::alert(OFFLINE_MESSAGES_MESSAGE, None)),
            Failure::AuthExpired => self.relogin.invoke(),
            _ => self.notifications.enqueue(Notification::alert(
                err.user_message(),
                Some(OFFLINE_MESSAGES_TITLE),
            )),
        }
    }

    /// Drain in the background and hand the report to `on_done` exactly once
    pub fn spawn<F>(&self, on_done: F)
    where
        F: FnOnce(OfflineSyncReport) + Send + 'static,
    {
        let this = self.clone();
        self.ctx.runtime.spawn(async move {
            let report = this.drain().await;
            on_done(report);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::RemoteError;
    use crate::test_support::{Call, Fixture};

    fn queue_messages(fx: &Fixture, messages: &[(&str, &str)]) {
        let mut state = fx.transport.state.lock();
        for (from, body) in messages {
            state
                .queued
                .push(Message::new(*from, Some(body.to_string())));
        }
    }

    fn key(s: &str) -> ConversationKey {
        ConversationKey::from_address(s)
    }

    #[tokio::test]
    async fn test_summary_for_many_single_body_for_one() {
        let fx = Fixture::new();
        fx.add_contact("a@x.com", "Ann");
        fx.add_contact("b@x.com", "Ben");
        queue_messages(
            &fx,
            &[
                ("a@x.com/1", "first"),
                ("b@x.com", "only"),
                ("a@x.com/2", "second"),
                ("a@x.com", "third"),
            ],
        );

        let report = fx.session.offline.drain().await;

        assert_eq!(report.received, 4);
        assert_eq!(report.notified, 2);
        assert_eq!(
            report.senders,
            vec![
                SenderSummary {
                    conversation: key("a@x.com"),
                    count: 3,
                    first_body: Some("first".into()),
                },
                SenderSummary {
                    conversation: key("b@x.com"),
                    count: 1,
                    first_body: Some("only".into()),
                },
            ]
        );

        let shown = fx.presenter.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Ann");
        assert_eq!(shown[0].body, offline_summary(3));

        fx.presenter.finish_next(crate::notifications::Outcome::Dismissed);
        let shown = fx.presenter.shown();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].title, "Ben");
        assert_eq!(shown[1].body, "only");
    }

    #[tokio::test]
    async fn test_open_conversation_gets_no_summary() {
        let fx = Fixture::new();
        fx.add_contact("a@x.com", "Ann");
        fx.add_contact("b@x.com", "Ben");
        fx.session.set_current_conversation(Some("b@x.com"));
        queue_messages(
            &fx,
            &[
                ("a@x.com", "1"),
                ("a@x.com", "2"),
                ("a@x.com", "3"),
                ("b@x.com", "hello"),
            ],
        );

        let report = fx.session.offline.drain().await;

        assert_eq!(report.notified, 1);
        assert_eq!(fx.presenter.shown_bodies(), vec![offline_summary(3)]);
        assert_eq!(fx.session.unread_count("b@x.com"), 0);
        assert_eq!(fx.session.unread_count("a@x.com"), 3);
    }

    #[tokio::test]
    async fn test_messages_are_logged_as_offline() {
        let fx = Fixture::new();
        fx.add_contact("a@x.com", "Ann");
        queue_messages(&fx, &[("a@x.com", "missed")]);

        fx.session.offline.drain().await;

        let log = fx.session.chat_log("a@x.com");
        assert_eq!(log.len(), 1);
        assert!(log[0].is_offline());
    }

    #[tokio::test]
    async fn test_single_empty_body_not_notified() {
        let fx = Fixture::new();
        fx.add_contact("a@x.com", "Ann");
        fx.transport
            .state
            .lock()
            .queued
            .push(Message::new("a@x.com", None));

        let report = fx.session.offline.drain().await;
        assert_eq!(report.received, 1);
        assert_eq!(report.notified, 0);
        assert!(fx.presenter.shown().is_empty());
    }

    #[tokio::test]
    async fn test_connectivity_failure_shows_generic_alert() {
        let fx = Fixture::new();
        fx.add_contact("a@x.com", "Ann");
        queue_messages(&fx, &[("a@x.com", "1"), ("a@x.com", "2")]);
        fx.transport.state.lock().drain_error = Some(RemoteError::no_response());

        let report = fx.session.offline.drain().await;

        assert_eq!(report.failure, Some(Failure::ConnectivityFailure));
        assert_eq!(report.received, 2);
        assert_eq!(report.notified, 0);
        // messages that did arrive were still ingested
        assert_eq!(fx.session.unread_count("a@x.com"), 2);

        let shown = fx.presenter.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, OFFLINE_MESSAGES_MESSAGE);
        assert_eq!(shown[0].title, "");
    }

    #[tokio::test]
    async fn test_other_failure_shown_verbatim() {
        let fx = Fixture::new();
        fx.transport.state.lock().drain_error = Some(RemoteError::new("500 oops"));

        let report = fx.session.offline.drain().await;

        assert_eq!(report.failure, Some(Failure::Other("500 oops".into())));
        let shown = fx.presenter.shown();
        assert_eq!(shown[0].body, "500 oops");
        assert_eq!(shown[0].title, OFFLINE_MESSAGES_TITLE);
    }

    #[tokio::test]
    async fn test_forbidden_triggers_relogin() {
        let fx = Fixture::logged_in().await;
        let logins = fx.transport.count(&Call::Login("me@x.com".into()));
        fx.transport.state.lock().drain_error = Some(RemoteError::new("403 forbidden"));

        let report = fx.session.offline.drain().await;
        assert_eq!(report.failure, Some(Failure::AuthExpired));
        assert!(fx.presenter.shown().is_empty());

        crate::test_support::settle().await;
        assert_eq!(
            fx.transport.count(&Call::Login("me@x.com".into())),
            logins + 1
        );
    }

    #[tokio::test]
    async fn test_messages_after_logout_are_dropped() {
        let fx = Fixture::new();
        fx.add_contact("a@x.com", "Ann");
        queue_messages(&fx, &[("a@x.com", "before"), ("a@x.com", "after")]);
        let resume = Arc::new(tokio::sync::Notify::new());
        fx.transport.state.lock().drain_hold = Some((1, resume.clone()));

        let offline = fx.session.offline.clone();
        let task = tokio::spawn(async move { offline.drain().await });
        crate::test_support::settle().await;
        assert_eq!(fx.session.chat_log("a@x.com").len(), 1);

        fx.session.logout().await;
        resume.notify_one();
        let report = task.await.unwrap();

        assert_eq!(report.received, 1);
        assert_eq!(report.notified, 0);
        assert!(report.failure.is_none());
        assert!(fx.session.chat_log("a@x.com").is_empty());
        assert_eq!(fx.session.unread_count("a@x.com"), 0);
        assert!(fx.presenter.shown().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_calls_back_once() {
        let fx = Fixture::new();
        fx.transport.state.lock().drain_error = Some(RemoteError::new("500 oops"));

        let (tx, rx) = tokio::sync::oneshot::channel();
        fx.session.offline.spawn(move |report| {
            let _ = tx.send(report);
        });

        let report = rx.await.unwrap();
        assert!(report.failure.is_some());
    }
}
