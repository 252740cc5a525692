//! penv Networking
//!
//! Request/response model and the I/O collaborators the environment calls
//! out to: connections, URI resolution, file storage and the cookie jar.

mod connection;
mod cookie;
mod fs;
mod request;
mod uri;

pub use connection::{Connection, DefaultConnection, FileConnection, HttpConnection, MemoryConnection};
pub use cookie::{CookieJar, SetCookie, StoredCookie, parse_set_cookie};
pub use fs::{FileStore, LocalFileStore, MemoryFileStore};
pub use request::{Method, Request, Response, reason_phrase};
pub use uri::{cwd_base, resolve_uri};
pub use url::Url;

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Cookie jar error: {0}")]
    Cookie(String),
}
