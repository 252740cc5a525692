//! Connections
//!
//! `performNetworkRequest`: everything the environment loads goes through a
//! [`Connection`]. `Err` means the transfer never happened; HTTP error
//! statuses are ordinary responses.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use url::Url;

use crate::{Method, NetError, Request, Response};

pub trait Connection {
    fn perform(&mut self, request: &Request) -> Result<Response, NetError>;
}

fn parse_url(url: &str) -> Result<Url, NetError> {
    Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{}: {}", url, e)))
}

/// Content type guessed from a file extension
fn content_type_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "xhtml" => "application/xhtml+xml",
        "xml" => "text/xml",
        "js" => "text/javascript",
        "json" => "application/json",
        "css" => "text/css",
        "txt" => "text/plain",
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// `file:` URLs through `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConnection;

impl Connection for FileConnection {
    fn perform(&mut self, request: &Request) -> Result<Response, NetError> {
        let url = parse_url(&request.url)?;
        if url.scheme() != "file" {
            return Err(NetError::UnsupportedScheme(url.scheme().to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|_| NetError::InvalidUrl(request.url.clone()))?;
        tracing::debug!("FILE {} {}", request.method.as_str(), path.display());

        match request.method {
            Method::Put | Method::Post => {
                std::fs::write(&path, request.body.as_deref().unwrap_or_default())?;
                Ok(Response::new(200))
            }
            Method::Delete => match std::fs::remove_file(&path) {
                Ok(()) => Ok(Response::new(200)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Response::new(404)),
                Err(e) => Err(e.into()),
            },
            _ => match std::fs::read(&path) {
                Ok(bytes) => {
                    let resp = Response::new(200)
                        .with_header("Content-Type", content_type_for(&path))
                        .with_header("Content-Length", &bytes.len().to_string());
                    Ok(if request.method == Method::Head {
                        resp
                    } else {
                        resp.with_body(bytes)
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Response::new(404)),
                Err(e) => Err(e.into()),
            },
        }
    }
}

/// HTTP(S) through a blocking `reqwest` client
pub struct HttpConnection {
    client: reqwest::blocking::Client,
}

impl HttpConnection {
    pub fn new(user_agent: &str) -> Result<Self, NetError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NetError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").finish_non_exhaustive()
    }
}

impl Connection for HttpConnection {
    fn perform(&mut self, request: &Request) -> Result<Response, NetError> {
        tracing::info!("HTTP {} {}", request.method.as_str(), request.url);

        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| NetError::Network(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .map_err(|e| NetError::Network(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| NetError::Network(e.to_string()))?
            .to_vec();

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[derive(Debug, Default)]
struct MemoryRoutes {
    routes: HashMap<String, Response>,
    failures: HashSet<String>,
    log: Vec<Request>,
}

/// Routes table standing in for the network; clones share routes and log
#[derive(Debug, Clone, Default)]
pub struct MemoryConnection {
    inner: Rc<RefCell<MemoryRoutes>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, response: Response) -> &Self {
        self.inner
            .borrow_mut()
            .routes
            .insert(url.to_string(), response);
        self
    }

    /// Serve `body` as `200 OK` with the given content type
    pub fn route_text(&self, url: &str, content_type: &str, body: &str) -> &Self {
        self.route(
            url,
            Response::ok(body).with_header("Content-Type", content_type),
        )
    }

    /// Requests to `url` fail outright with [`NetError::Network`]
    pub fn fail(&self, url: &str) -> &Self {
        self.inner.borrow_mut().failures.insert(url.to_string());
        self
    }

    /// Every request performed so far
    pub fn requests(&self) -> Vec<Request> {
        self.inner.borrow().log.clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.borrow().log.len()
    }
}

impl Connection for MemoryConnection {
    fn perform(&mut self, request: &Request) -> Result<Response, NetError> {
        let mut inner = self.inner.borrow_mut();
        inner.log.push(request.clone());
        if inner.failures.contains(&request.url) {
            return Err(NetError::Network(format!("connection to {} refused", request.url)));
        }
        // fragments never reach the server
        let key = request.url.split('#').next().unwrap_or_default();
        Ok(inner
            .routes
            .get(key)
            .cloned()
            .unwrap_or_else(|| Response::new(404)))
    }
}

/// Scheme dispatch: `file:`, `http(s):` and `about:blank`
#[derive(Debug, Default)]
pub struct DefaultConnection {
    file: FileConnection,
    http: Option<HttpConnection>,
    user_agent: String,
}

impl DefaultConnection {
    pub fn new(user_agent: &str) -> Self {
        Self {
            file: FileConnection,
            http: None,
            user_agent: user_agent.to_string(),
        }
    }

    fn http(&mut self) -> Result<&mut HttpConnection, NetError> {
        if self.http.is_none() {
            self.http = Some(HttpConnection::new(&self.user_agent)?);
        }
        self.http
            .as_mut()
            .ok_or_else(|| NetError::Network("HTTP client unavailable".into()))
    }
}

impl Connection for DefaultConnection {
    fn perform(&mut self, request: &Request) -> Result<Response, NetError> {
        let url = parse_url(&request.url)?;
        match url.scheme() {
            "file" => self.file.perform(request),
            "http" | "https" => self.http()?.perform(request),
            "about" if url.path() == "blank" => Ok(Response::ok("")
                .with_header("Content-Type", "text/html")),
            other => Err(NetError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_routes() {
        let conn = MemoryConnection::new();
        conn.route_text("http://a.test/", "text/html", "<p>hi</p>");
        let mut handle = conn.clone();

        let resp = handle.perform(&Request::get("http://a.test/#frag")).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.text(), "<p>hi</p>");

        let missing = handle.perform(&Request::get("http://a.test/nope")).unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(missing.status_text, "Not Found");
        assert_eq!(conn.request_count(), 2);
    }

    #[test]
    fn test_memory_failure() {
        let mut conn = MemoryConnection::new();
        conn.fail("http://down.test/");
        assert!(matches!(
            conn.perform(&Request::get("http://down.test/")),
            Err(NetError::Network(_))
        ));
    }

    #[test]
    fn test_file_connection() {
        let path = std::env::temp_dir().join(format!("penv-conn-{}.html", std::process::id()));
        let url = Url::from_file_path(&path).unwrap().to_string();
        let mut conn = FileConnection;

        let put = Request::new(Method::Put, &url).with_body(b"<b>x</b>".to_vec());
        assert_eq!(conn.perform(&put).unwrap().status, 200);

        let resp = conn.perform(&Request::get(&url)).unwrap();
        assert_eq!(resp.text(), "<b>x</b>");
        assert_eq!(resp.content_type().as_deref(), Some("text/html"));

        let del = Request::new(Method::Delete, &url);
        assert_eq!(conn.perform(&del).unwrap().status, 200);
        assert_eq!(conn.perform(&Request::get(&url)).unwrap().status, 404);
    }

    #[test]
    fn test_default_connection_schemes() {
        let mut conn = DefaultConnection::new("penv-test");
        let blank = conn.perform(&Request::get("about:blank")).unwrap();
        assert_eq!(blank.status, 200);
        assert!(blank.body.is_empty());
        assert!(matches!(
            conn.perform(&Request::get("ftp://files.test/a")),
            Err(NetError::UnsupportedScheme(_))
        ));
    }
}
