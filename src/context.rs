//! Handles shared by every session component

use crate::credentials::CredentialStore;
use crate::epoch::SessionEpoch;
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::gate::SharedReadiness;
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Session-wide status flags
#[derive(Debug, Default)]
pub struct SessionFlags {
    connected: AtomicBool,
    roster_loaded: AtomicBool,
    offline_fetched: AtomicBool,
}

impl SessionFlags {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_roster_loaded(&self) -> bool {
        self.roster_loaded.load(Ordering::Acquire)
    }

    pub fn set_roster_loaded(&self, loaded: bool) {
        self.roster_loaded.store(loaded, Ordering::Release);
    }

    /// Mark offline messages as fetched; true only for the first caller
    pub fn claim_offline_fetch(&self) -> bool {
        !self.offline_fetched.swap(true, Ordering::AcqRel)
    }

    pub fn reset(&self) {
        self.set_connected(false);
        self.set_roster_loaded(false);
        self.offline_fetched.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct SessionContext {
    /// Runtime network work is spawned on
    pub runtime: Handle,
    pub transport: Arc<dyn Transport>,
    pub credentials: Arc<dyn CredentialStore>,
    pub events: EventBus,
    pub epoch: SessionEpoch,
    pub readiness: SharedReadiness,
    pub flags: Arc<SessionFlags>,
}

impl SessionContext {
    /// Build a context bound to the runtime of the calling task
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        events: EventBus,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;

        Ok(Self {
            runtime,
            transport,
            credentials,
            events,
            epoch: SessionEpoch::new(),
            readiness: SharedReadiness::default(),
            flags: Arc::new(SessionFlags::default()),
        })
    }

    /// Fail with `StaleSession` once the session moved past `generation`
    pub fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.epoch.is_current(generation) {
            Ok(())
        } else {
            Err(Error::StaleSession)
        }
    }
}
