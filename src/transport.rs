//! Chat backend collaborators
//!
//! The wire protocol lives outside this crate. These traits are the narrow
//! surface the session core drives it through.

use crate::contacts::RosterEntry;
use crate::conversation::ConversationKey;
use crate::failure::RemoteError;
use crate::messages::Message;
use async_trait::async_trait;

/// Backend client. Errors carry the raw transport code.
#[async_trait]
pub trait Transport: Send + Sync {
    fn is_logged_in(&self) -> bool;

    /// Current root endpoint
    fn root_url(&self) -> String;

    /// Override the root endpoint; `None` restores the default
    fn set_root_url(&self, url: Option<&str>);

    fn set_token(&self, token: Option<&str>);

    fn set_client_key(&self, key: &str);

    /// Exchange username and long-lived secret for a session token
    async fn login(&self, username: &str, secret: &str) -> Result<String, RemoteError>;

    async fn fetch_key(&self) -> Result<String, RemoteError>;

    /// Register a push delivery address along with the pinned conversations
    async fn register(
        &self,
        address: &str,
        pinned: &[ConversationKey],
    ) -> Result<(), RemoteError>;

    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, RemoteError>;

    /// Hand every queued offline message to `on_each`, then return.
    ///
    /// An error may arrive after some messages were already delivered.
    async fn drain_queued_messages(
        &self,
        on_each: &mut (dyn FnMut(Message) + Send),
    ) -> Result<(), RemoteError>;

    /// Decode the payload of a raw push notification
    async fn parse_message(&self, payload: &str) -> Result<Message, RemoteError>;

    async fn logout(&self) -> Result<(), RemoteError>;
}

/// Conversations the user pinned for quick access
pub trait PinnedConversations: Send + Sync {
    fn pinned(&self) -> Vec<ConversationKey>;
}

/// No pinned conversations
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPins;

impl PinnedConversations for NoPins {
    fn pinned(&self) -> Vec<ConversationKey> {
        Vec::new()
    }
}

impl PinnedConversations for Vec<ConversationKey> {
    fn pinned(&self) -> Vec<ConversationKey> {
        self.clone()
    }
}
