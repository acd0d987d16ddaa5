use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use typed_builder::TypedBuilder;

use crate::error::{Error, Result};

/// Everything needed to stress one API: the request template, how hard to push
/// it, and what a correct response looks like.
///
/// A descriptor is read-only input to a run. Overrides are applied to a copy
/// (see [`Overrides::apply`]) so the caller's list is never touched.
#[derive(Debug, Clone, PartialEq, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[builder(setter(into))]
    pub name: String,

    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    #[builder(default = default_scheme(), setter(into))]
    pub scheme: String,
    /// Host name, optionally with a port.
    #[builder(setter(into))]
    pub host: String,
    #[serde(default = "default_path")]
    #[builder(default = default_path(), setter(into))]
    pub path: String,
    #[serde(default = "default_method")]
    #[builder(default = default_method(), setter(into))]
    pub method: String,
    #[serde(default)]
    #[builder(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub body: Option<RequestBody>,
    /// Per-request timeout in seconds. Zero disables the timeout.
    #[serde(default)]
    #[builder(default)]
    pub timeout: u64,

    /// Admission attempts per tick.
    #[serde(default)]
    #[builder(default)]
    pub req_per_sec: usize,
    /// Number of ticks (seconds) the run lasts.
    #[serde(default)]
    #[builder(default)]
    pub duration: u64,
    /// Upper bound on requests in flight at any instant.
    #[serde(default)]
    #[builder(default)]
    pub max_running_req: usize,

    #[serde(default)]
    #[builder(default)]
    pub expect: Expectation,

    /// Abort the whole process on the first failed request.
    #[serde(default)]
    #[builder(default)]
    pub fail_exit: bool,
}

fn default_scheme() -> String {
    "http".to_owned()
}

fn default_path() -> String {
    "/".to_owned()
}

fn default_method() -> String {
    "GET".to_owned()
}

impl Endpoint {
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }
}

/// Request payload: a literal string is sent as is, anything else is
/// serialized as JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(Value),
}

impl RequestBody {
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            RequestBody::Text(text) => Ok(Bytes::from(text.clone())),
            RequestBody::Json(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| Error::config(format!("cannot serialize request body: {e}"))),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_owned())
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => RequestBody::Text(text),
            other => RequestBody::Json(other),
        }
    }
}

/// What a response must look like to count as a success.
#[derive(Debug, Clone, PartialEq, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    /// Accepted status codes, matched exactly.
    #[serde(default = "default_status")]
    #[builder(default = default_status())]
    pub status: Vec<u16>,
    /// One of `equal`, `equal_json`, `reg` or `pcp`.
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub body_expect_type: Option<String>,
    /// Mode specific value: a string, a JSON value or a program.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub body_exp: Value,
    #[serde(default)]
    #[builder(default)]
    pub log_body: bool,
}

fn default_status() -> Vec<u16> {
    vec![200]
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            status: default_status(),
            body_expect_type: None,
            body_exp: Value::Null,
            log_body: false,
        }
    }
}

/// Run parameters supplied from outside the config file.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder)]
pub struct Overrides {
    #[builder(default, setter(strip_option, into))]
    pub host: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub scheme: Option<String>,
    /// Restrict the run to the endpoint with this name.
    #[builder(default, setter(strip_option, into))]
    pub only: Option<String>,
}

impl Overrides {
    pub fn selects(&self, endpoint: &Endpoint) -> bool {
        self.only.as_ref().is_none_or(|name| *name == endpoint.name)
    }

    /// Returns a copy of `endpoint` with host and scheme replaced where set.
    pub fn apply(&self, endpoint: &Endpoint) -> Endpoint {
        let mut copy = endpoint.clone();
        if let Some(host) = &self.host {
            copy.host = host.clone();
        }
        if let Some(scheme) = &self.scheme {
            copy.scheme = scheme.clone();
        }
        copy
    }
}
