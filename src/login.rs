//! Top-level login entry point and its request queue

use crate::config::{
    AUTH_ERROR_MESSAGE, AUTH_ERROR_TITLE, CONNECTION_ERROR_MESSAGE, CONNECTION_ERROR_TITLE,
    LOGIN_TITLE,
};
use crate::context::SessionContext;
use crate::credentials::CredentialSlot;
use crate::error::{Error, Result};
use crate::events::{LoginPrompt, SessionEvent};
use crate::failure::{Failure, Operation};
use crate::gate::ReadinessGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct QueueInner {
    pending: AtomicBool,
    notify: Notify,
}

/// Coalescing login request signal. Requests made while one is already
/// pending collapse into it.
#[derive(Debug, Clone, Default)]
pub struct LoginQueue {
    inner: Arc<QueueInner>,
}

impl LoginQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        if !self.inner.pending.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_one();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Wait for a request and consume it
    async fn next(&self) {
        loop {
            if self.inner.pending.swap(false, Ordering::AcqRel) {
                return;
            }
            self.inner.notify.notified().await;
        }
    }
}

/// What a login pass ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No stored credential; the user was sent to the login screen
    PromptShown,
    AlreadyLoggedIn,
    /// Token and endpoint restored from the credential store
    CachedToken,
    /// Fresh token obtained from the backend
    LoggedIn,
}

#[derive(Clone)]
pub struct LoginFlow {
    ctx: SessionContext,
    gate: Arc<ReadinessGate>,
    queue: LoginQueue,
}

impl LoginFlow {
    pub fn new(ctx: SessionContext, gate: Arc<ReadinessGate>, queue: LoginQueue) -> Self {
        Self { ctx, gate, queue }
    }

    /// Make sure the transport holds a token, logging in if it has to
    pub async fn login_if_needed(&self) -> Result<LoginOutcome> {
        let credentials = &self.ctx.credentials;
        let transport = &self.ctx.transport;

        let Some(secret) = credentials.get(CredentialSlot::Auth) else {
            info!("No stored credentials, login required");
            self.ctx
                .events
                .publish(SessionEvent::LoginRequired(LoginPrompt::NoCredentials));
            return Ok(LoginOutcome::PromptShown);
        };

        if transport.is_logged_in() {
            return Ok(LoginOutcome::AlreadyLoggedIn);
        }

        self.ctx.flags.set_connected(false);

        if let (Some(token), Some(root)) = (
            credentials.get(CredentialSlot::Token),
            credentials.get(CredentialSlot::RootUrl),
        ) {
            debug!(root = %root, "Using cached token");
            transport.set_token(Some(&token));
            transport.set_root_url(Some(&root));
            self.gate.notify_token_ready();
            return Ok(LoginOutcome::CachedToken);
        }

        let generation = self.ctx.epoch.current();
        let username = credentials.get(CredentialSlot::Username).unwrap_or_default();
        info!(username = %username, "Logging in");

        let token = transport
            .login(&username, &secret)
            .await
            .map_err(|e| Error::remote(Operation::Login, e))?;
        self.ctx.ensure_current(generation)?;

        credentials.put(CredentialSlot::Token, &token);
        credentials.put(CredentialSlot::RootUrl, &transport.root_url());
        self.gate.notify_token_ready();
        Ok(LoginOutcome::LoggedIn)
    }

    /// Map a failed login onto events
    pub fn report_failure(&self, err: Error) {
        let Some(failure) = err.failure() else {
            match err {
                Error::StaleSession => debug!("Login finished after the session was reset"),
                other => warn!(error = %other, "Login failed"),
            }
            return;
        };

        warn!(error = %err, "Login failed");
        match failure {
            Failure::ConnectivityFailure => self
                .ctx
                .events
                .connect_failed(CONNECTION_ERROR_MESSAGE, CONNECTION_ERROR_TITLE),
            Failure::InvalidCredentials => {
                self.ctx.credentials.remove(CredentialSlot::Auth);
                self.ctx.events.publish(SessionEvent::LoginRequired(
                    LoginPrompt::InvalidCredentials {
                        message: AUTH_ERROR_MESSAGE.to_string(),
                        title: AUTH_ERROR_TITLE.to_string(),
                    },
                ));
            }
            _ => self.ctx.events.connect_failed(err.user_message(), LOGIN_TITLE),
        }
    }

    /// Serve login requests one at a time until the task is aborted
    pub async fn run(self) {
        loop {
            self.queue.next().await;
            match self.login_if_needed().await {
                Ok(outcome) => debug!(?outcome, "Login pass finished"),
                Err(e) => self.report_failure(e),
            }
        }
    }
}
