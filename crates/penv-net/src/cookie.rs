//! Cookie Jar
//!
//! Cookies are stored as a nested mapping domain → path → name, serialized
//! as JSON for persistence. Domains with a leading dot also match their
//! subdomains; host-only cookies are keyed by the exact host.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{FileStore, NetError};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One persisted cookie value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    #[serde(default)]
    pub secure: bool,
    /// Seconds, as given by the server
    #[serde(rename = "max-age", default)]
    pub max_age: Option<i64>,
    /// Milliseconds since the epoch
    #[serde(rename = "date-created")]
    pub date_created: u64,
    /// Milliseconds since the epoch; `None` for session cookies
    #[serde(default)]
    pub expiration: Option<u64>,
}

impl StoredCookie {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiration.is_some_and(|at| at <= now)
    }
}

/// A parsed `Set-Cookie` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub max_age: Option<i64>,
}

/// Directory part of a request path, the default cookie path
fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Parse a `Set-Cookie` header received from `host` for `request_path`
pub fn parse_set_cookie(header: &str, host: &str, request_path: &str) -> Option<SetCookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = SetCookie {
        name: name.to_string(),
        value: value.trim().trim_matches('"').to_string(),
        domain: host.to_ascii_lowercase(),
        path: default_path(request_path),
        secure: false,
        http_only: false,
        max_age: None,
    };

    for part in parts {
        let part = part.trim();
        match part.split_once('=') {
            Some((attr, val)) => {
                let val = val.trim();
                match attr.trim().to_ascii_lowercase().as_str() {
                    "domain" if !val.is_empty() => {
                        let domain = val.trim_start_matches('.').to_ascii_lowercase();
                        cookie.domain = format!(".{}", domain);
                    }
                    "path" if val.starts_with('/') => cookie.path = val.to_string(),
                    "max-age" => cookie.max_age = val.parse().ok(),
                    _ => {}
                }
            }
            None => match part.to_ascii_lowercase().as_str() {
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            },
        }
    }

    Some(cookie)
}

fn matches_domain(cookie_domain: &str, host: &str) -> bool {
    match cookie_domain.strip_prefix('.') {
        Some(base) => host == base || host.ends_with(cookie_domain),
        None => host == cookie_domain,
    }
}

fn matches_path(cookie_path: &str, request_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path[cookie_path.len()..].starts_with('/')))
}

type PathMap = BTreeMap<String, BTreeMap<String, StoredCookie>>;

/// Cookie jar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    domains: BTreeMap<String, PathMap>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the cookie from a `Set-Cookie` header received from `url`
    pub fn set_cookie(&mut self, url: &Url, header: &str) -> Result<(), NetError> {
        self.set_cookie_at(url, header, now_ms())
    }

    pub fn set_cookie_at(&mut self, url: &Url, header: &str, now: u64) -> Result<(), NetError> {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let cookie = parse_set_cookie(header, &host, url.path())
            .ok_or_else(|| NetError::Cookie(format!("malformed Set-Cookie: {}", header)))?;

        if !matches_domain(&cookie.domain, &host) {
            return Err(NetError::Cookie(format!(
                "{} may not set cookies for {}",
                host, cookie.domain
            )));
        }

        // A non-positive max-age deletes
        if cookie.max_age.is_some_and(|age| age <= 0) {
            self.remove(&cookie.domain, &cookie.path, &cookie.name);
            return Ok(());
        }

        tracing::debug!(
            "Cookie {}={} for {}{}",
            cookie.name,
            cookie.value,
            cookie.domain,
            cookie.path
        );
        let stored = StoredCookie {
            value: cookie.value,
            secure: cookie.secure,
            max_age: cookie.max_age,
            date_created: now,
            expiration: cookie
                .max_age
                .map(|age| now.saturating_add((age as u64).saturating_mul(1000))),
        };
        self.domains
            .entry(cookie.domain)
            .or_default()
            .entry(cookie.path)
            .or_default()
            .insert(cookie.name, stored);
        Ok(())
    }

    pub fn remove(&mut self, domain: &str, path: &str, name: &str) -> bool {
        let Some(paths) = self.domains.get_mut(domain) else {
            return false;
        };
        let removed = paths
            .get_mut(path)
            .is_some_and(|names| names.remove(name).is_some());
        paths.retain(|_, names| !names.is_empty());
        if paths.is_empty() {
            self.domains.remove(domain);
        }
        removed
    }

    /// `Cookie` request header value for `url`, if any cookie applies
    pub fn cookies_for(&self, url: &Url) -> Option<String> {
        self.cookies_for_at(url, now_ms())
    }

    pub fn cookies_for_at(&self, url: &Url, now: u64) -> Option<String> {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let secure_channel = url.scheme() == "https";

        // longer paths first
        let mut matching: Vec<(usize, &str, &StoredCookie)> = Vec::new();
        for (domain, paths) in &self.domains {
            if !matches_domain(domain, &host) {
                continue;
            }
            for (path, names) in paths {
                if !matches_path(path, url.path()) {
                    continue;
                }
                for (name, cookie) in names {
                    if cookie.is_expired(now) || (cookie.secure && !secure_channel) {
                        continue;
                    }
                    matching.push((path.len(), name, cookie));
                }
            }
        }
        if matching.is_empty() {
            return None;
        }
        matching.sort_by(|a, b| b.0.cmp(&a.0));
        Some(
            matching
                .iter()
                .map(|(_, name, cookie)| format!("{}={}", name, cookie.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Drop every cookie whose expiration has passed
    pub fn remove_expired(&mut self, now: u64) {
        for paths in self.domains.values_mut() {
            for names in paths.values_mut() {
                names.retain(|_, c| !c.is_expired(now));
            }
            paths.retain(|_, names| !names.is_empty());
        }
        self.domains.retain(|_, paths| !paths.is_empty());
    }

    pub fn get(&self, domain: &str, path: &str, name: &str) -> Option<&StoredCookie> {
        self.domains.get(domain)?.get(path)?.get(name)
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        serde_json::to_string_pretty(&self.domains).map_err(|e| NetError::Cookie(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let domains = serde_json::from_str(json).map_err(|e| NetError::Cookie(e.to_string()))?;
        Ok(Self { domains })
    }

    /// Read the jar at `path`; a missing file yields an empty jar
    pub fn load(store: &dyn FileStore, path: &str) -> Result<Self, NetError> {
        match store.read_text(path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::new()),
            Ok(text) => {
                let mut jar = Self::from_json(&text)?;
                jar.remove_expired(now_ms());
                Ok(jar)
            }
            Err(NetError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    /// Persist session and persistent cookies alike
    pub fn save(&self, store: &dyn FileStore, path: &str) -> Result<(), NetError> {
        store.write_text(path, &self.to_json()?)
    }

    pub fn len(&self) -> usize {
        self.domains
            .values()
            .flat_map(|paths| paths.values())
            .map(|names| names.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }
}
