//! Classification of transport error codes
//!
//! The transport reports failures as a bare string: empty means no response,
//! a three digit prefix is an HTTP-style status, anything else is a message
//! meant for the user.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// HTTP-style status at the start of an error code ("403 forbidden")
static STATUS_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{3})").expect("Invalid status prefix regex"));

/// Raw error code reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError(String);

impl RemoteError {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The "no response" signal
    pub fn no_response() -> Self {
        Self(String::new())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_no_response(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Leading HTTP-style status, if any
    pub fn status(&self) -> Option<u16> {
        STATUS_PREFIX
            .captures(&self.0)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_response() {
            write!(f, "no response")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::error::Error for RemoteError {}

/// The backend call that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    FetchKey,
    Register,
    LoadRoster,
    OfflineSync,
    ParseMessage,
    Logout,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Login => write!(f, "login"),
            Operation::FetchKey => write!(f, "fetch_key"),
            Operation::Register => write!(f, "register"),
            Operation::LoadRoster => write!(f, "load_roster"),
            Operation::OfflineSync => write!(f, "offline_sync"),
            Operation::ParseMessage => write!(f, "parse_message"),
            Operation::Logout => write!(f, "logout"),
        }
    }
}

/// What a failed operation means for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No response at all
    ConnectivityFailure,
    /// Session is stale; purge the token and log in again
    AuthExpired,
    /// Login rejected the stored username/password
    InvalidCredentials,
    /// Registration rejected the client itself
    ApiRejected,
    /// Anything else, shown to the user verbatim
    Other(String),
}

/// Map a transport error onto the failure taxonomy for `operation`
pub fn classify(error: &RemoteError, operation: Operation) -> Failure {
    if error.is_no_response() {
        return Failure::ConnectivityFailure;
    }

    match (error.status(), operation) {
        // a 403 while logging in must not restart the login it came from
        (Some(403), Operation::Login) => Failure::Other(error.code().to_string()),
        (Some(403), _) => Failure::AuthExpired,
        (Some(401), Operation::Login) => Failure::InvalidCredentials,
        (Some(401), Operation::Register) => Failure::ApiRejected,
        _ => Failure::Other(error.code().to_string()),
    }
}
