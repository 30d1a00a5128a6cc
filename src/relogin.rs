//! Credential reset after the backend reports a stale session

use crate::context::SessionContext;
use crate::credentials::CredentialSlot;
use crate::login::LoginQueue;
use tracing::info;

/// Drops the cached token and endpoint, forgets the registration made with
/// them and asks the login driver for one fresh login.
///
/// Invoking it again before the login runs changes nothing: the state is
/// already cleared and the login request coalesces.
#[derive(Clone)]
pub struct ReLoginFlow {
    ctx: SessionContext,
    login: LoginQueue,
}

impl ReLoginFlow {
    pub fn new(ctx: SessionContext, login: LoginQueue) -> Self {
        Self { ctx, login }
    }

    pub fn invoke(&self) {
        self.ctx.credentials.remove(CredentialSlot::Token);
        self.ctx.credentials.remove(CredentialSlot::RootUrl);
        self.ctx.transport.set_token(None);
        self.ctx.transport.set_root_url(None);

        let was_active = {
            let mut readiness = self.ctx.readiness.lock();
            let active = readiness.has_token || readiness.registered_address.is_some();
            readiness.reset_token();
            active
        };

        if was_active {
            let generation = self.ctx.epoch.advance();
            info!(generation, "Session token dropped, logging in again");
        }

        self.login.request();
    }
}
