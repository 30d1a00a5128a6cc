//! Readiness gate: registration fires once both the push delivery address
//! and an auth token are available.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Join state for the two readiness signals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessState {
    /// Latest push delivery address; the only address ever registered
    pub delivery_address: Option<String>,
    pub has_token: bool,
    pub registered_address: Option<String>,
}

impl ReadinessState {
    pub fn has_delivery_address(&self) -> bool {
        self.delivery_address.is_some()
    }

    /// Claim the current address for registration if both signals are in
    /// and it has not been registered yet.
    fn claim(&mut self) -> Option<String> {
        if !self.has_token {
            return None;
        }
        let address = self.delivery_address.as_ref()?;
        if self.registered_address.as_ref() == Some(address) {
            return None;
        }
        self.registered_address = Some(address.clone());
        Some(address.clone())
    }

    /// Forget the token and the registration made with it
    pub(crate) fn reset_token(&mut self) {
        self.has_token = false;
        self.registered_address = None;
    }

    /// Allow `address` to be registered again after a failed attempt
    pub(crate) fn release(&mut self, address: &str) -> bool {
        if self.registered_address.as_deref() == Some(address) {
            self.registered_address = None;
            true
        } else {
            false
        }
    }
}

/// Readiness state shared between the gate and the components that reset it
pub type SharedReadiness = Arc<Mutex<ReadinessState>>;

/// Receives the registration trigger. Must not block.
pub trait Registrar: Send + Sync {
    fn register(&self, address: String);
}

pub struct ReadinessGate {
    state: SharedReadiness,
    registrar: Arc<dyn Registrar>,
}

impl ReadinessGate {
    pub fn new(state: SharedReadiness, registrar: Arc<dyn Registrar>) -> Self {
        Self { state, registrar }
    }

    /// The push channel produced (or changed) its delivery address
    pub fn notify_delivery_address_ready(&self, address: &str) {
        let claimed = {
            let mut state = self.state.lock();
            state.delivery_address = Some(address.to_string());
            state.claim()
        };
        self.fire(claimed);
    }

    /// An auth token became available
    pub fn notify_token_ready(&self) {
        let claimed = {
            let mut state = self.state.lock();
            state.has_token = true;
            state.claim()
        };
        self.fire(claimed);
    }

    pub fn state(&self) -> ReadinessState {
        self.state.lock().clone()
    }

    fn fire(&self, claimed: Option<String>) {
        match claimed {
            Some(address) => {
                info!(address = %address, "Readiness gate open, registering");
                self.registrar.register(address);
            }
            None => debug!("Readiness gate still waiting"),
        }
    }
}
