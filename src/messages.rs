//! Inbound chat messages

use crate::conversation::ConversationKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as delivered by the transport. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    from: String,
    body: Option<String>,
    #[serde(default)]
    offline: bool,
    received_at: DateTime<Utc>,
}

impl Message {
    /// A message delivered by live push
    pub fn new(from: impl Into<String>, body: Option<String>) -> Self {
        Self {
            from: from.into(),
            body,
            offline: false,
            received_at: Utc::now(),
        }
    }

    /// Same message, flagged as delivered from the offline backlog
    pub fn into_offline(self) -> Self {
        Self {
            offline: true,
            ..self
        }
    }

    /// Sender address, possibly with a `/resource` suffix
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// True when the body is present and non-empty
    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::from_address(&self.from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_body() {
        assert!(Message::new("a@x.com", Some("hi".into())).has_body());
        assert!(!Message::new("a@x.com", Some(String::new())).has_body());
        assert!(!Message::new("a@x.com", None).has_body());
    }

    #[test]
    fn test_into_offline_keeps_content() {
        let live = Message::new("a@x.com/phone", Some("hi".into()));
        assert!(!live.is_offline());

        let offline = live.clone().into_offline();
        assert!(offline.is_offline());
        assert_eq!(offline.from(), live.from());
        assert_eq!(offline.body(), live.body());
        assert_eq!(offline.received_at(), live.received_at());
    }

    #[test]
    fn test_conversation_key() {
        let msg = Message::new("a@x.com/phone", None);
        assert_eq!(msg.conversation_key().as_str(), "a@x.com");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::new("a@x.com/phone", Some("hello".into())).into_offline();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("a@x.com/phone"));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }
}
