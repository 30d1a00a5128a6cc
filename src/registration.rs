//! Push registration handshake

use crate::config::{
    API_ERROR_MESSAGE, API_ERROR_TITLE, CONNECTION_ERROR_MESSAGE, CONNECTION_ERROR_TITLE,
    REGISTER_TITLE,
};
use crate::context::SessionContext;
use crate::credentials::CredentialSlot;
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::failure::{Failure, Operation};
use crate::gate::Registrar;
use crate::relogin::ReLoginFlow;
use crate::roster_sync::RosterSync;
use crate::transport::PinnedConversations;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPhase {
    #[default]
    Idle,
    FetchingKey,
    Registering,
    Registered,
}

impl fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationPhase::Idle => write!(f, "idle"),
            RegistrationPhase::FetchingKey => write!(f, "fetching_key"),
            RegistrationPhase::Registering => write!(f, "registering"),
            RegistrationPhase::Registered => write!(f, "registered"),
        }
    }
}

/// Phase plus the session generation of the attempt that set it
#[derive(Debug, Default)]
struct PhaseSlot {
    phase: RegistrationPhase,
    generation: u64,
}

/// Registers a push delivery address with the backend, fetching the
/// client key first if this installation has none.
///
/// Does not deduplicate; the readiness gate decides when to call it.
#[derive(Clone)]
pub struct RegistrationProtocol {
    ctx: SessionContext,
    pinned: Arc<dyn PinnedConversations>,
    relogin: ReLoginFlow,
    roster_sync: RosterSync,
    phase: Arc<Mutex<PhaseSlot>>,
}

impl RegistrationProtocol {
    pub fn new(
        ctx: SessionContext,
        pinned: Arc<dyn PinnedConversations>,
        relogin: ReLoginFlow,
        roster_sync: RosterSync,
    ) -> Self {
        Self {
            ctx,
            pinned,
            relogin,
            roster_sync,
            phase: Arc::new(Mutex::new(PhaseSlot::default())),
        }
    }

    pub fn phase(&self) -> RegistrationPhase {
        self.phase.lock().phase
    }

    fn set_phase(&self, generation: u64, phase: RegistrationPhase) {
        let previous = {
            let mut slot = self.phase.lock();
            slot.generation = generation;
            std::mem::replace(&mut slot.phase, phase)
        };
        if previous != phase {
            debug!(from = %previous, to = %phase, "Registration phase");
        }
    }

    /// Back to idle, whatever attempt was in flight
    pub fn reset(&self) {
        self.set_phase(self.ctx.epoch.current(), RegistrationPhase::Idle);
    }

    /// Back to idle unless a newer attempt has taken over the phase
    fn abandon(&self, generation: u64) {
        let mut slot = self.phase.lock();
        if slot.generation == generation {
            slot.phase = RegistrationPhase::Idle;
        }
    }

    /// Run the handshake for `address`; on success mark the session
    /// connected and load the roster.
    pub async fn register_address(&self, address: &str) -> Result<()> {
        self.register_in(address, self.ctx.epoch.current()).await
    }

    async fn register_in(&self, address: &str, generation: u64) -> Result<()> {
        let transport = &self.ctx.transport;

        match self.ctx.credentials.get(CredentialSlot::ClientKey) {
            Some(key) => transport.set_client_key(&key),
            None => {
                self.set_phase(generation, RegistrationPhase::FetchingKey);
                let key = transport
                    .fetch_key()
                    .await
                    .map_err(|e| Error::remote(Operation::FetchKey, e))?;
                self.ctx.ensure_current(generation)?;

                self.ctx.credentials.put(CredentialSlot::ClientKey, &key);
                transport.set_client_key(&key);
            }
        }

        self.set_phase(generation, RegistrationPhase::Registering);
        let pinned = self.pinned.pinned();
        transport
            .register(address, &pinned)
            .await
            .map_err(|e| Error::remote(Operation::Register, e))?;
        self.ctx.ensure_current(generation)?;

        self.set_phase(generation, RegistrationPhase::Registered);
        info!(address = %address, pinned = pinned.len(), "Registered for push");
        self.ctx.flags.set_connected(true);
        self.ctx.events.publish(SessionEvent::Connected);

        self.roster_sync.load().await;
        Ok(())
    }

    /// Register and route any failure to the user or the re-login flow
    pub async fn run(&self, address: &str) {
        let generation = self.ctx.epoch.current();
        if let Err(e) = self.register_in(address, generation).await {
            self.report_failure(address, generation, e);
        }
    }

    fn report_failure(&self, address: &str, generation: u64, err: Error) {
        if matches!(err, Error::StaleSession) {
            debug!(address = %address, "Registration finished after the session was reset");
            self.abandon(generation);
            return;
        }

        warn!(address = %address, error = %err, "Registration failed");
        self.set_phase(generation, RegistrationPhase::Idle);

        let failure = err.failure();
        if failure != Some(Failure::AuthExpired) {
            // let the next readiness signal try this address again
            self.ctx.readiness.lock().release(address);
        }

        match failure {
            Some(Failure::ConnectivityFailure) => self
                .ctx
                .events
                .connect_failed(CONNECTION_ERROR_MESSAGE, CONNECTION_ERROR_TITLE),
            Some(Failure::AuthExpired) => self.relogin.invoke(),
            Some(Failure::ApiRejected) => {
                self.ctx.events.connect_failed(API_ERROR_MESSAGE, API_ERROR_TITLE)
            }
            _ => self
                .ctx
                .events
                .connect_failed(err.user_message(), REGISTER_TITLE),
        }
    }
}

impl Registrar for RegistrationProtocol {
    fn register(&self, address: String) {
        let this = self.clone();
        self.ctx.runtime.spawn(async move {
            this.run(&address).await;
        });
    }
}
