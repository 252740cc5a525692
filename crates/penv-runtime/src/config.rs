//! Environment configuration

use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// Default `User-Agent` header
pub const DEFAULT_USER_AGENT: &str = concat!("penv/", env!("CARGO_PKG_VERSION"));

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DOMImplementation `errorChecking`
    pub error_checking: bool,
    /// Upper bound of one idle sleep inside `wait`
    pub wait_interval_ms: u64,
    /// Floor for `set_timeout` delays requested while the loop runs
    pub min_timer_ms: u64,
    /// Minimum `set_interval` period
    pub min_interval_ms: u64,
    /// Run `<script>` elements
    pub load_scripts: bool,
    /// Fire `load` for `<img src>`
    pub load_images: bool,
    pub user_agent: String,
    /// JSON cookie jar location; cookies stay in memory when unset
    pub cookie_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_checking: true,
            wait_interval_ms: 100,
            min_timer_ms: 0,
            min_interval_ms: 10,
            load_scripts: true,
            load_images: true,
            user_agent: DEFAULT_USER_AGENT.into(),
            cookie_file: None,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON document over the defaults
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(json).map_err(|e| RuntimeError::Config(e.to_string()))
    }
}
