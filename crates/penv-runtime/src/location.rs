//! Location and History
//!
//! `window.location` parts over a parsed [`Url`], and the session history
//! list navigation pushes onto.

use penv_net::{NetError, Url};

/// Location state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn parse(href: &str) -> Result<Self, NetError> {
        let url = Url::parse(href).map_err(|e| NetError::InvalidUrl(format!("{}: {}", href, e)))?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Full URL
    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    /// Protocol (e.g., "https:")
    pub fn protocol(&self) -> String {
        format!("{}:", self.url.scheme())
    }

    /// Host (hostname:port)
    pub fn host(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{}", self.hostname(), port),
            None => self.hostname().to_string(),
        }
    }

    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    pub fn port(&self) -> String {
        self.url.port().map(|p| p.to_string()).unwrap_or_default()
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    /// Query string including `?`, empty when there is none
    pub fn search(&self) -> String {
        match self.url.query() {
            Some(q) if !q.is_empty() => format!("?{}", q),
            _ => String::new(),
        }
    }

    /// Fragment including `#`, empty when there is none
    pub fn hash(&self) -> String {
        match self.url.fragment() {
            Some(f) if !f.is_empty() => format!("#{}", f),
            _ => String::new(),
        }
    }

    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub(crate) fn set(&mut self, url: Url) {
        self.url = url;
    }

    /// True if `other` names this document, ignoring fragments
    pub fn is_same_document(&self, other: &Url) -> bool {
        let mut a = self.url.clone();
        let mut b = other.clone();
        a.set_fragment(None);
        b.set_fragment(None);
        a == b
    }

    /// True if navigating to `other` only scrolls to a new fragment
    pub fn is_fragment_change(&self, other: &Url) -> bool {
        other.fragment().is_some()
            && self.is_same_document(other)
            && self.url.fragment() != other.fragment()
    }
}

/// Session history
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    pub fn new(initial_url: &str) -> Self {
        Self {
            entries: vec![initial_url.to_string()],
            index: 0,
        }
    }

    /// New entry after the current one; forward entries are dropped
    pub fn push(&mut self, url: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url.to_string());
        self.index = self.entries.len() - 1;
    }

    pub fn replace(&mut self, url: &str) {
        self.entries[self.index] = url.to_string();
    }

    pub fn back(&mut self) -> Option<&str> {
        self.go(-1)
    }

    pub fn forward(&mut self) -> Option<&str> {
        self.go(1)
    }

    /// Move by `delta` entries; `None` (and no move) when out of range
    pub fn go(&mut self, delta: i32) -> Option<&str> {
        let target = self.index.checked_add_signed(delta as isize)?;
        if delta == 0 || target >= self.entries.len() {
            return None;
        }
        self.index = target;
        Some(&self.entries[target])
    }

    pub fn length(&self) -> usize {
        self.entries.len()
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }
}
