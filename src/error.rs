//! Error types for gchat-core

use crate::failure::{classify, Failure, Operation, RemoteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{operation} failed: {source}")]
    Remote {
        operation: Operation,
        #[source]
        source: RemoteError,
    },

    #[error("Callback outlived its session")]
    StaleSession,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn remote(operation: Operation, source: RemoteError) -> Self {
        Error::Remote { operation, source }
    }

    /// Failure class for remote errors, `None` for local ones
    pub fn failure(&self) -> Option<Failure> {
        match self {
            Error::Remote { operation, source } => Some(classify(source, *operation)),
            _ => None,
        }
    }

    /// Text to show the user: the raw transport code for remote errors
    pub fn user_message(&self) -> String {
        match self {
            Error::Remote { source, .. } => source.code().to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
