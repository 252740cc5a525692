//! penv
//!
//! A headless browser environment for embedded scripts: a DOM Level 2 tree
//! with event dispatch, a cooperative timer loop, navigation, cookies and
//! XMLHttpRequest, all driven from one thread.
//!
//! # Example
//! ```rust,ignore
//! use penv::{Window, init_tracing};
//!
//! init_tracing();
//! let mut window = Window::new()?;
//! window.assign("https://example.com")?;
//! window.wait(None);
//! ```

use tracing_subscriber::EnvFilter;

pub use penv_runtime::*;

// Re-export sub-crates for advanced usage
pub use penv_dom as dom;
pub use penv_net as net;
pub use penv_runtime as runtime;

/// penv version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
    }
}
