//! Fake collaborators shared by the unit tests

use crate::config::Config;
use crate::contacts::{Contact, MemoryRoster, Roster, RosterEntry};
use crate::conversation::ConversationKey;
use crate::credentials::MemoryCredentialStore;
use crate::events::{EventReceiver, SessionEvent};
use crate::failure::RemoteError;
use crate::messages::Message;
use crate::notifications::{Completion, Notification, Outcome, Presenter};
use crate::session::{Session, SessionCollaborators};
use crate::transport::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

pub const DEFAULT_ROOT: &str = "https://gchat.example/api";

/// Presenter that keeps every completion until the test finishes it
#[derive(Default)]
pub struct RecordingPresenter {
    shown: Mutex<Vec<Notification>>,
    open: Mutex<VecDeque<Completion>>,
}

impl RecordingPresenter {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }

    pub fn shown_bodies(&self) -> Vec<String> {
        self.shown.lock().iter().map(|n| n.body.clone()).collect()
    }

    pub fn outstanding(&self) -> usize {
        self.open.lock().len()
    }

    pub fn take_next(&self) -> Option<Completion> {
        self.open.lock().pop_front()
    }

    pub fn try_finish_next(&self, outcome: Outcome) -> bool {
        let next = self.take_next();
        match next {
            Some(completion) => {
                completion.finish(outcome);
                true
            }
            None => false,
        }
    }

    pub fn finish_next(&self, outcome: Outcome) {
        assert!(self.try_finish_next(outcome), "no notification on screen");
    }
}

impl Presenter for RecordingPresenter {
    fn show(&self, notification: Notification, completion: Completion) {
        self.shown.lock().push(notification);
        self.open.lock().push_back(completion);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    FetchKey,
    Register(String, Vec<ConversationKey>),
    FetchRoster,
    Drain,
    Parse(String),
    Logout,
}

pub struct FakeState {
    pub token: Option<String>,
    pub root_url: Option<String>,
    pub client_key: Option<String>,
    pub login: Result<String, RemoteError>,
    pub login_root: Option<String>,
    pub fetch_key: Result<String, RemoteError>,
    pub register: VecDeque<Result<(), RemoteError>>,
    pub roster: Result<Vec<RosterEntry>, RemoteError>,
    pub queued: Vec<Message>,
    pub drain_error: Option<RemoteError>,
    /// Stop the drain after this many messages until the notify fires
    pub drain_hold: Option<(usize, Arc<Notify>)>,
    /// Hold the key fetch until the notify fires
    pub fetch_key_hold: Option<Arc<Notify>>,
    /// Hold every parse until the notify fires
    pub parse_hold: Option<Arc<Notify>>,
    pub calls: Vec<Call>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            token: None,
            root_url: None,
            client_key: None,
            login: Ok("token-1".to_string()),
            login_root: None,
            fetch_key: Ok("key-1".to_string()),
            register: VecDeque::new(),
            roster: Ok(Vec::new()),
            queued: Vec::new(),
            drain_error: None,
            drain_hold: None,
            fetch_key_hold: None,
            parse_hold: None,
            calls: Vec::new(),
        }
    }
}

/// Scriptable transport. Register succeeds unless a result was queued.
/// Logged in whenever a token is installed.
#[derive(Default)]
pub struct FakeTransport {
    pub state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn register_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Register(address, _) => Some(address),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn is_logged_in(&self) -> bool {
        self.state.lock().token.is_some()
    }

    fn root_url(&self) -> String {
        self.state
            .lock()
            .root_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ROOT.to_string())
    }

    fn set_root_url(&self, url: Option<&str>) {
        self.state.lock().root_url = url.map(str::to_string);
    }

    fn set_token(&self, token: Option<&str>) {
        self.state.lock().token = token.map(str::to_string);
    }

    fn set_client_key(&self, key: &str) {
        self.state.lock().client_key = Some(key.to_string());
    }

    async fn login(&self, username: &str, _secret: &str) -> Result<String, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Login(username.to_string()));
        let result = state.login.clone();
        if let Ok(token) = &result {
            state.token = Some(token.clone());
            if let Some(root) = state.login_root.clone() {
                state.root_url = Some(root);
            }
        }
        result
    }

    async fn fetch_key(&self) -> Result<String, RemoteError> {
        let (result, hold) = {
            let mut state = self.state.lock();
            state.calls.push(Call::FetchKey);
            (state.fetch_key.clone(), state.fetch_key_hold.clone())
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }
        result
    }

    async fn register(
        &self,
        address: &str,
        pinned: &[ConversationKey],
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::Register(address.to_string(), pinned.to_vec()));
        state.register.pop_front().unwrap_or(Ok(()))
    }

    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(Call::FetchRoster);
        state.roster.clone()
    }

    async fn drain_queued_messages(
        &self,
        on_each: &mut (dyn FnMut(Message) + Send),
    ) -> Result<(), RemoteError> {
        let (queued, error, hold) = {
            let mut state = self.state.lock();
            state.calls.push(Call::Drain);
            (
                std::mem::take(&mut state.queued),
                state.drain_error.clone(),
                state.drain_hold.clone(),
            )
        };
        for (i, message) in queued.into_iter().enumerate() {
            if let Some((after, notify)) = &hold {
                if i == *after {
                    notify.notified().await;
                }
            }
            on_each(message);
        }
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn parse_message(&self, payload: &str) -> Result<Message, RemoteError> {
        let hold = {
            let mut state = self.state.lock();
            state.calls.push(Call::Parse(payload.to_string()));
            state.parse_hold.clone()
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }
        match payload.split_once(':') {
            Some((from, body)) => Ok(Message::new(from, Some(body.to_string()))),
            None => Err(RemoteError::new(format!("bad payload {}", payload))),
        }
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Logout);
        state.token = None;
        Ok(())
    }
}

/// Everything published so far, without waiting
pub fn drain_events(rx: &mut EventReceiver) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned tasks run until they go idle
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// A session wired to fakes, with an event subscription taken up front
pub struct Fixture {
    pub session: Session,
    pub transport: Arc<FakeTransport>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub roster: Arc<MemoryRoster>,
    pub presenter: Arc<RecordingPresenter>,
    pub events: EventReceiver,
    _dir: TempDir,
}

impl Fixture {
    /// Session with stored credentials, not logged in yet
    pub fn new() -> Self {
        Self::with_pins(Vec::new())
    }

    pub fn with_pins(pins: Vec<ConversationKey>) -> Self {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::default());
        let credentials = Arc::new(MemoryCredentialStore::with_login("me@x.com", "secret"));
        let roster = Arc::new(MemoryRoster::new());
        let presenter = Arc::new(RecordingPresenter::default());

        let session = Session::new(
            Config::for_test(dir.path()),
            SessionCollaborators {
                transport: transport.clone(),
                credentials: credentials.clone(),
                roster: roster.clone(),
                presenter: presenter.clone(),
                pinned: Arc::new(pins),
            },
        )
        .unwrap();
        let events = session.subscribe();

        Self {
            session,
            transport,
            credentials,
            roster,
            presenter,
            events,
            _dir: dir,
        }
    }

    /// Logged in and registered for "uri-1", with events drained
    pub async fn logged_in() -> Self {
        Self::logged_in_with(|_| {}).await
    }

    /// Like `logged_in`, scripting the transport before the first login
    pub async fn logged_in_with(script: impl FnOnce(&FakeTransport)) -> Self {
        let mut fx = Self::new();
        script(&fx.transport);
        fx.session.notify_delivery_address_ready("uri-1");
        fx.session.login_if_needed();
        settle().await;
        drain_events(&mut fx.events);
        fx
    }

    pub fn add_contact(&self, address: &str, name: &str) -> Arc<Contact> {
        let contact = Arc::new(Contact::new(
            ConversationKey::from_address(address),
            Some(name.to_string()),
        ));
        self.roster.insert(contact.clone());
        contact
    }
}
