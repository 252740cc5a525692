//! XMLHttpRequest
//!
//! Request objects live in the window and are addressed by [`XhrHandle`], so
//! a `readystatechange` callback can borrow the window mutably and still
//! reach its own request. Asynchronous sends run from the event loop through
//! `run_async`; abort is cooperative and checked before every callback.

use std::fmt;
use std::rc::Rc;

use penv_dom::events::CallbackError;
use penv_dom::{DocumentKind, NodeId, ReadyState};
use penv_net::{Method, Request, Response, Url};

use crate::{RuntimeResult, Window, XhrError};

/// XMLHttpRequest ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum XhrReadyState {
    /// Created, `open` not called yet
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    /// Body transfer in progress
    Loading = 3,
    Done = 4,
}

/// Request handle, valid until [`Window::xhr_release`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XhrHandle(usize);

impl XhrHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `onreadystatechange`
pub type XhrCallback = Rc<dyn Fn(&mut Window, XhrHandle) -> Result<(), CallbackError>>;

/// XMLHttpRequest object
#[derive(Default)]
pub struct XmlHttpRequest {
    ready_state: XhrReadyState,
    status: u16,
    status_text: String,
    response_text: String,
    response_headers: Vec<(String, String)>,
    response_xml: Option<NodeId>,

    method: Method,
    url: String,
    async_flag: bool,
    request_headers: Vec<(String, String)>,
    send_flag: bool,
    aborted: bool,
    /// Bumped by `open`, so a transfer scheduled before it is dropped
    generation: u64,
    onreadystatechange: Option<XhrCallback>,
}

impl fmt::Debug for XmlHttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlHttpRequest")
            .field("ready_state", &self.ready_state)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("status", &self.status)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

impl XmlHttpRequest {
    pub fn ready_state(&self) -> XhrReadyState {
        self.ready_state
    }

    /// HTTP status; 0 before headers arrive and for network errors
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    /// Document parsed from an HTML or XML response
    pub fn response_xml(&self) -> Option<NodeId> {
        self.response_xml
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Resolved request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_async(&self) -> bool {
        self.async_flag
    }

    /// Get response header (case-insensitive, repeated headers joined)
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        if self.ready_state < XhrReadyState::HeadersReceived {
            return None;
        }
        let values: Vec<&str> = self
            .response_headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }

    /// Get all response headers as string
    pub fn get_all_response_headers(&self) -> String {
        if self.ready_state < XhrReadyState::HeadersReceived {
            return String::new();
        }
        let mut result = String::new();
        for (name, value) in &self.response_headers {
            result.push_str(name);
            result.push_str(": ");
            result.push_str(value);
            result.push_str("\r\n");
        }
        result
    }

    /// Set request header
    pub fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), XhrError> {
        if self.ready_state != XhrReadyState::Opened || self.send_flag {
            return Err(XhrError::InvalidState("setRequestHeader before open or after send"));
        }
        if is_forbidden_header(&name.to_ascii_lowercase()) {
            return Err(XhrError::ForbiddenHeader(name.to_string()));
        }
        // Combine with existing header if present
        match self
            .request_headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self
                .request_headers
                .push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn clear_response(&mut self) {
        self.status = 0;
        self.status_text.clear();
        self.response_text.clear();
        self.response_headers.clear();
        self.response_xml = None;
    }
}

/// Check if header is forbidden
fn is_forbidden_header(name: &str) -> bool {
    matches!(
        name,
        "accept-charset"
            | "accept-encoding"
            | "access-control-request-headers"
            | "access-control-request-method"
            | "connection"
            | "content-length"
            | "cookie"
            | "cookie2"
            | "date"
            | "dnt"
            | "expect"
            | "host"
            | "keep-alive"
            | "origin"
            | "referer"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "user-agent"
            | "via"
    ) || name.starts_with("proxy-")
        || name.starts_with("sec-")
}

fn document_kind_for(content_type: Option<&str>) -> Option<DocumentKind> {
    match content_type? {
        "text/html" | "application/xhtml+xml" => Some(DocumentKind::Html),
        "text/xml" | "application/xml" => Some(DocumentKind::Xml),
        ct if ct.ends_with("+xml") => Some(DocumentKind::Xml),
        _ => None,
    }
}

impl Window {
    /// `new XMLHttpRequest()`
    pub fn xhr_create(&mut self) -> XhrHandle {
        self.xhrs.push(Some(XmlHttpRequest::default()));
        XhrHandle(self.xhrs.len() - 1)
    }

    pub fn xhr(&self, handle: XhrHandle) -> Option<&XmlHttpRequest> {
        self.xhrs.get(handle.0)?.as_ref()
    }

    fn xhr_mut(&mut self, handle: XhrHandle) -> Result<&mut XmlHttpRequest, XhrError> {
        self.xhrs
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or(XhrError::UnknownRequest(handle))
    }

    pub fn xhr_set_onreadystatechange(
        &mut self,
        handle: XhrHandle,
        callback: impl Fn(&mut Window, XhrHandle) -> Result<(), CallbackError> + 'static,
    ) -> Result<(), XhrError> {
        self.xhr_mut(handle)?.onreadystatechange = Some(Rc::new(callback));
        Ok(())
    }

    /// `open(method, url, async, user, password)`
    pub fn xhr_open(
        &mut self,
        handle: XhrHandle,
        method: &str,
        url: &str,
        async_flag: bool,
        user: Option<&str>,
        password: Option<&str>,
    ) -> RuntimeResult<()> {
        let method =
            Method::parse(method).ok_or_else(|| XhrError::UnsupportedMethod(method.to_string()))?;
        let resolved = self.resolve_url(url)?;
        let resolved = match user {
            Some(user) => with_credentials(&resolved, user, password),
            None => resolved,
        };
        let previous = self.xhr(handle).and_then(|x| x.response_xml);

        let xhr = self.xhr_mut(handle)?;
        xhr.method = method;
        xhr.url = resolved;
        xhr.async_flag = async_flag;
        xhr.request_headers.clear();
        xhr.send_flag = false;
        xhr.aborted = false;
        xhr.generation += 1;
        xhr.clear_response();
        xhr.ready_state = XhrReadyState::Opened;
        tracing::debug!("XHR {:?} opened {} {}", handle, xhr.method.as_str(), xhr.url);

        if let Some(doc) = previous {
            self.release_response_document(doc);
        }
        self.xhr_changed(handle);
        Ok(())
    }

    pub fn xhr_set_request_header(
        &mut self,
        handle: XhrHandle,
        name: &str,
        value: &str,
    ) -> Result<(), XhrError> {
        self.xhr_mut(handle)?.set_request_header(name, value)
    }

    /// `send(body)`: blocks for synchronous requests, schedules the transfer
    /// on the event loop otherwise
    pub fn xhr_send(&mut self, handle: XhrHandle, body: Option<&str>) -> RuntimeResult<()> {
        let xhr = self.xhr_mut(handle)?;
        if xhr.ready_state != XhrReadyState::Opened || xhr.send_flag {
            return Err(XhrError::InvalidState("send before open or while sending").into());
        }
        xhr.send_flag = true;

        let mut request = Request::new(xhr.method, &xhr.url);
        request.headers = xhr.request_headers.clone();
        request.synchronous = !xhr.async_flag;
        if let Some(body) = body {
            if !matches!(xhr.method, Method::Get | Method::Head) {
                request.body = Some(body.as_bytes().to_vec());
            }
        }
        let generation = xhr.generation;

        if request.synchronous {
            self.xhr_transfer(handle, request, generation);
        } else {
            self.run_async(move |window: &mut Window| {
                window.xhr_transfer(handle, request.clone(), generation);
                Ok(())
            });
        }
        Ok(())
    }

    /// `abort()`: an in-flight request goes to Done (with a callback) and then
    /// back to Unsent. Anything else is left as it is.
    pub fn xhr_abort(&mut self, handle: XhrHandle) -> Result<(), XhrError> {
        let xhr = self.xhr_mut(handle)?;
        let in_flight = match xhr.ready_state {
            XhrReadyState::Opened => xhr.send_flag,
            XhrReadyState::HeadersReceived | XhrReadyState::Loading => true,
            XhrReadyState::Unsent | XhrReadyState::Done => false,
        };
        if !in_flight {
            return Ok(());
        }
        tracing::debug!("XHR {:?} aborted", handle);
        xhr.aborted = true;
        xhr.send_flag = false;
        xhr.clear_response();
        xhr.ready_state = XhrReadyState::Done;
        self.xhr_changed(handle);
        if let Ok(xhr) = self.xhr_mut(handle) {
            xhr.ready_state = XhrReadyState::Unsent;
        }
        Ok(())
    }

    /// Free the request and its response document
    pub fn xhr_release(&mut self, handle: XhrHandle) -> bool {
        let Some(xhr) = self.xhrs.get_mut(handle.0).and_then(Option::take) else {
            return false;
        };
        if let Some(doc) = xhr.response_xml {
            self.release_response_document(doc);
        }
        true
    }

    /// True while `handle` still belongs to the transfer started at `generation`
    fn xhr_live(&self, handle: XhrHandle, generation: u64) -> bool {
        self.xhr(handle)
            .is_some_and(|x| !x.aborted && x.generation == generation)
    }

    fn xhr_transfer(&mut self, handle: XhrHandle, request: Request, generation: u64) {
        if !self.xhr_live(handle, generation) {
            return;
        }
        let url = request.url.clone();
        tracing::debug!("XHR {:?} sending {} {}", handle, request.method.as_str(), url);
        let response = match self.perform(request) {
            Ok(response) => response,
            Err(err) => Response::network_error(&url, &err.to_string()),
        };

        let Ok(xhr) = self.xhr_mut(handle) else {
            return;
        };
        xhr.status = response.status;
        xhr.status_text = response.status_text.clone();
        xhr.response_headers = response.headers.clone();
        xhr.ready_state = XhrReadyState::HeadersReceived;
        self.xhr_changed(handle);
        if !self.xhr_live(handle, generation) {
            return;
        }

        if let Ok(xhr) = self.xhr_mut(handle) {
            xhr.ready_state = XhrReadyState::Loading;
        }
        self.xhr_changed(handle);
        if !self.xhr_live(handle, generation) {
            return;
        }

        let response_xml = self.parse_response_document(&url, &response);
        let Ok(xhr) = self.xhr_mut(handle) else {
            return;
        };
        xhr.response_text = response.text();
        xhr.response_xml = response_xml;
        xhr.send_flag = false;
        xhr.ready_state = XhrReadyState::Done;
        self.xhr_changed(handle);
    }

    fn parse_response_document(&mut self, url: &str, response: &Response) -> Option<NodeId> {
        if response.is_network_error() {
            return None;
        }
        let kind = document_kind_for(response.content_type().as_deref())?;
        let parser = self.parser.clone()?;
        let doc = self.dom.create_document(kind, url);
        if let Err(err) = self.dom.set_parsing(doc, true) {
            tracing::warn!("{}", err);
        }
        if let Err(err) = parser.parse_into(self, &response.text(), doc) {
            tracing::warn!("Could not parse response from {}: {:#}", url, err);
        }
        let finished = self
            .dom
            .set_parsing(doc, false)
            .and_then(|_| self.dom.set_ready_state(doc, ReadyState::Complete));
        if let Err(err) = finished {
            tracing::warn!("{}", err);
        }
        Some(doc)
    }

    fn release_response_document(&mut self, doc: NodeId) {
        if let Err(err) = self.discard(doc) {
            tracing::debug!("Response document {} already gone: {}", doc, err);
        }
    }

    /// Invoke `onreadystatechange`, unless the request was aborted meanwhile
    fn xhr_changed(&mut self, handle: XhrHandle) {
        let Some(xhr) = self.xhr(handle) else {
            return;
        };
        let Some(callback) = xhr.onreadystatechange.clone() else {
            return;
        };
        if xhr.aborted && xhr.ready_state != XhrReadyState::Done {
            return;
        }
        if let Err(err) = callback(self, handle) {
            tracing::error!("onreadystatechange for {:?} failed: {:#}", handle, err);
        }
    }
}

fn with_credentials(url: &str, user: &str, password: Option<&str>) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.set_username(user).is_err() || parsed.set_password(password).is_err() {
        tracing::warn!("Cannot attach credentials to {}", url);
        return url.to_string();
    }
    parsed.to_string()
}
