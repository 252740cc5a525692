use penv_dom::{DomError, EventError};
use penv_net::NetError;

use crate::XhrHandle;

/// XHR errors
#[derive(Debug, thiserror::Error)]
pub enum XhrError {
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Forbidden header: {0}")]
    ForbiddenHeader(String),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Unknown request {0:?}")]
    UnknownRequest(XhrHandle),

    #[error("Network error: {0}")]
    Network(String),
}

/// Environment error
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Xhr(#[from] XhrError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
