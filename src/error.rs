use std::path::PathBuf;

use thiserror::Error;

use crate::expression::EvalError;

/// Every failure the engine can produce.
///
/// Errors fall into two families. Configuration errors (`Config`, `Io`) stop an
/// endpoint before its run starts. Request errors (`Transport`, `Status`,
/// `Body`, `Json`, `Expression`) are recorded against a single request and
/// never leave the unit of work that produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("status check failed, http status code is {status}, expected status are {expected:?}. Body is {body}")]
    Status {
        status: u16,
        expected: Vec<u16>,
        body: String,
    },

    #[error("body check failed, body is {body}, expected {expected}")]
    Body { body: String, expected: String },

    #[error("expression failed: {0}")]
    Expression(#[from] EvalError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("response body is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// True for errors that prevent a run from starting at all.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Io { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
