//! Session events, published to any number of listeners

use crate::conversation::ConversationKey;
use crate::messages::Message;
use tokio::sync::broadcast;

/// Why the user has to be sent to the login screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginPrompt {
    /// No long-lived credential is stored
    NoCredentials,
    /// The stored credential was rejected and has been purged
    InvalidCredentials { message: String, title: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    ConnectFailed { message: String, title: String },
    RosterUpdated,
    MessageReceived(Message),
    LoginRequired(LoginPrompt),
    /// The user opened a message notification
    NotificationOpened(ConversationKey),
    LoggedOut,
}

pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Single-writer, multi-reader event channel. Events published with no
/// listener are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(size: usize) -> Self {
        let (tx, _) = broadcast::channel(size.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn connect_failed(&self, message: impl Into<String>, title: impl Into<String>) {
        self.publish(SessionEvent::ConnectFailed {
            message: message.into(),
            title: title.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(SessionEvent::Connected);

        assert_eq!(a.recv().await.unwrap(), SessionEvent::Connected);
        assert_eq!(b.recv().await.unwrap(), SessionEvent::Connected);
    }

    #[test]
    fn test_publish_without_listeners() {
        let bus = EventBus::new(8);
        bus.publish(SessionEvent::RosterUpdated);
    }

    #[tokio::test]
    async fn test_connect_failed_helper() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.connect_failed("boom", "Title");
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::ConnectFailed {
                message: "boom".into(),
                title: "Title".into()
            }
        );
    }
}
