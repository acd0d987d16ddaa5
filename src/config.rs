use std::{path::Path, str::FromStr};

use serde::Deserialize;

use crate::{
    endpoint::Endpoint,
    error::{Error, Result},
};

/// Top level of a stress config file.
///
/// ```json
/// {
///   "apis": [
///     {
///       "name": "health",
///       "host": "localhost:8080",
///       "path": "/health",
///       "reqPerSec": 10,
///       "duration": 5,
///       "maxRunningReq": 20,
///       "expect": { "status": [200], "bodyExpectType": "equal", "bodyExp": "ok" }
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StressConfig {
    #[serde(default, alias = "Apis")]
    pub apis: Vec<Endpoint>,
}

impl StressConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&source)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }
}

impl FromStr for StressConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::config(format!("malformed config: {e}")))
    }
}
