//! Configuration, limits and user-facing texts

use std::path::{Path, PathBuf};

/// Session limits and storage locations
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub snapshot_file: PathBuf,
    pub chat_log_capacity: usize,
    pub recent_contacts_capacity: usize,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("gchat"))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            snapshot_file: data_dir.join("session.json"),
            data_dir,
            chat_log_capacity: MAXIMUM_CHAT_LOG_SIZE,
            recent_contacts_capacity: RECENT_CONTACTS_COUNT,
            event_capacity: 100,
        }
    }
}

impl Config {
    /// Create config for testing with custom paths
    pub fn for_test(temp_dir: &Path) -> Self {
        Self {
            data_dir: temp_dir.to_path_buf(),
            snapshot_file: temp_dir.join("session.json"),
            chat_log_capacity: MAXIMUM_CHAT_LOG_SIZE,
            recent_contacts_capacity: RECENT_CONTACTS_COUNT,
            event_capacity: 100,
        }
    }

    /// Same limits, snapshot stored at `path`
    pub fn with_snapshot_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_file = path.into();
        self
    }
}

/// Messages kept per conversation before the oldest is evicted
pub const MAXIMUM_CHAT_LOG_SIZE: usize = 50;

/// Length of the "seen recently" contact list
pub const RECENT_CONTACTS_COUNT: usize = 10;

pub const CONNECTION_ERROR_TITLE: &str = "Connection error";
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Can't connect to the server. Check your network connection and try again.";
pub const AUTH_ERROR_TITLE: &str = "Sign in failed";
pub const AUTH_ERROR_MESSAGE: &str =
    "Your username or password is no longer valid. Please sign in again.";
pub const API_ERROR_TITLE: &str = "Server error";
pub const API_ERROR_MESSAGE: &str =
    "The notification server rejected this app. Please update to the latest version.";
pub const LOGIN_TITLE: &str = "Login";
pub const REGISTER_TITLE: &str = "Registration";
pub const CONTACT_LIST_TITLE: &str = "Contact list";
pub const CONTACT_LIST_MESSAGE: &str = "Couldn't download your contact list.";
pub const OFFLINE_MESSAGES_TITLE: &str = "Offline messages";
pub const OFFLINE_MESSAGES_MESSAGE: &str = "Couldn't download your offline messages.";
pub const MESSAGE_PARSING_TITLE: &str = "Message parsing";

/// Body of the notification summarising several offline messages
pub fn offline_summary(count: usize) -> String {
    format!("{} new messages", count)
}
