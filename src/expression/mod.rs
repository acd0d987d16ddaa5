//! Expression language boundary used by the `pcp` body check.
//!
//! The validator only knows the [`ExpressionEngine`] trait: hand it a program
//! and a [`Host`], get back a JSON value. The host is the sandbox the program
//! runs in and exposes a single capability, `getJson`, which parses the
//! response body. Whatever the engine returns, the validator insists on a
//! boolean.
//!
//! [`PcpEngine`] is the built-in engine. Programs are JSON documents where an
//! array headed by a string is a function call:
//!
//! ```text
//! ["==", ["prop", ["getJson"], "errno"], 0]
//! ```
pub mod pcp;
pub use pcp::PcpEngine;

use serde_json::Value;
use thiserror::Error;

/// Failure while parsing or running a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("program is not valid json: {0}")]
    Parse(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("`{name}`: {message}")]
    Type { name: String, message: String },
    #[error("host function `{name}` failed: {message}")]
    Host { name: String, message: String },
}

/// Capabilities a program may call back into.
pub trait Host {
    /// Parses the response body as JSON.
    fn get_json(&self) -> Result<Value, EvalError>;
}

/// Host exposing a response body.
#[derive(Debug, Clone, Copy)]
pub struct BodyHost<'a> {
    body: &'a [u8],
}

impl<'a> BodyHost<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self { body }
    }
}

impl Host for BodyHost<'_> {
    fn get_json(&self) -> Result<Value, EvalError> {
        serde_json::from_slice(self.body).map_err(|e| EvalError::Host {
            name: "getJson".to_owned(),
            message: e.to_string(),
        })
    }
}

/// Runs programs of an embedded expression language.
pub trait ExpressionEngine: Send + Sync {
    fn execute(&self, program: &str, host: &dyn Host) -> Result<Value, EvalError>;
}
