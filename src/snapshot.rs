//! Session snapshot - persistent JSON storage for chat logs and unread counts

use crate::config::Config;
use crate::conversation::ConversationKey;
use crate::error::{Error, Result};
use crate::messages::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persisted per-conversation state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub chat_log: BTreeMap<ConversationKey, Vec<Message>>,
    #[serde(default)]
    pub unread: BTreeMap<ConversationKey, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Every conversation with a log or an unread count, sorted
    pub fn conversations(&self) -> Vec<ConversationKey> {
        let mut keys: Vec<_> = self
            .chat_log
            .keys()
            .chain(self.unread.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn history(&self, key: &ConversationKey) -> &[Message] {
        self.chat_log.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn unread_total(&self) -> u64 {
        self.unread.values().map(|c| u64::from(*c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chat_log.is_empty() && self.unread.is_empty()
    }
}

/// Location of the snapshot file
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(config: &Config) -> Self {
        Self::at(config.snapshot_file.clone())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or an empty one if nothing was saved yet
    pub fn load(&self) -> Result<SessionSnapshot> {
        if !self.path.exists() {
            return Ok(SessionSnapshot::default());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to disk atomically
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // temp file in the same directory so the rename stays atomic
        let mut temp = NamedTempFile::new_in(parent)?;
        let json = serde_json::to_string_pretty(snapshot)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Remove the snapshot file; true if there was one
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
