//! Gchat session core
//!
//! Client-side session and notification delivery for the Gchat chat client.
//! The transport, credential store, roster and presenter are collaborators
//! supplied by the embedding app.

pub mod chat_log;
pub mod config;
pub mod contacts;
pub mod context;
pub mod conversation;
pub mod credentials;
pub mod epoch;
pub mod error;
pub mod events;
pub mod failure;
pub mod gate;
pub mod login;
pub mod messages;
pub mod notifications;
pub mod offline;
pub mod pipeline;
pub mod recent;
pub mod registration;
pub mod relogin;
pub mod roster_sync;
pub mod session;
pub mod snapshot;
pub mod transport;
pub mod unread;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use events::{LoginPrompt, SessionEvent};
pub use failure::{Failure, Operation, RemoteError};
pub use messages::Message;
pub use session::{Session, SessionCollaborators};
