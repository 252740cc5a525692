//! Document loading
//!
//! Element load behaviours (scripts, images, custom hooks) and the navigation
//! state machine that replaces the window's document.

use penv_dom::events::{DomEventType, Event, EventTarget};
use penv_dom::{DocumentKind, NodeId, ReadyState, XHTML_NAMESPACE};
use penv_net::{Request, Response, Url};

use crate::{RuntimeError, RuntimeResult, Window};

/// Script `type` values that mean JavaScript
const SCRIPT_TYPES: &[&str] = &[
    "",
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "text/ecmascript",
    "application/ecmascript",
    "module",
];

impl Window {
    /// `onElementComplete`: called by the parser once per finished element
    pub fn element_popped(&mut self, namespace: Option<&str>, tag: &str, node: NodeId) {
        if !matches!(namespace, None | Some(XHTML_NAMESPACE)) {
            return;
        }
        if self.dom.connected_document(node) != Some(self.document) {
            return;
        }
        tracing::trace!("Element popped: <{}> {}", tag, node);
        self.element_inserted(node);
    }

    /// Built-in behaviour for `element`, then every custom hook
    pub(crate) fn element_inserted(&mut self, element: NodeId) {
        match self.html_tag(element).as_deref() {
            Some("script") => self.load_script(element),
            Some("img") => self.load_image(element),
            _ => {}
        }
        let hooks = self.insert_hooks.clone();
        for hook in hooks {
            if let Err(err) = hook(self, element) {
                tracing::error!("Insert hook failed for {}: {:#}", element, err);
            }
        }
    }

    fn load_script(&mut self, script: NodeId) {
        if !self.config.load_scripts || self.executed_scripts.contains(&script) {
            return;
        }
        if let Some(ty) = self.dom.get_attribute(script, "type") {
            let ty = ty.trim().to_ascii_lowercase();
            if !SCRIPT_TYPES.contains(&ty.as_str()) {
                tracing::debug!("Skipping script of type {}", ty);
                return;
            }
        }

        let (source, url) = match self.dom.get_attribute(script, "src") {
            Some(src) => {
                self.executed_scripts.insert(script);
                let url = match self.resolve_url(&src) {
                    Ok(url) if !url.is_empty() => url,
                    Ok(_) => return,
                    Err(err) => {
                        tracing::warn!("Bad script src {}: {}", src, err);
                        self.fire(script, DomEventType::Error, false, false);
                        return;
                    }
                };
                match self.perform(Request::get(&url)) {
                    Ok(response) if response.is_success() => (response.text(), url),
                    Ok(response) => {
                        tracing::warn!("Script {} failed with status {}", url, response.status);
                        self.fire(script, DomEventType::Error, false, false);
                        return;
                    }
                    Err(err) => {
                        tracing::warn!("Script {} failed: {}", url, err);
                        self.fire(script, DomEventType::Error, false, false);
                        return;
                    }
                }
            }
            None => {
                let text = self.dom.text_content(script).ok().flatten().unwrap_or_default();
                if text.trim().is_empty() {
                    return;
                }
                self.executed_scripts.insert(script);
                let url = self.location.href().to_string();
                (text, url)
            }
        };

        let external = self.dom.has_attribute(script, "src");
        match self.evaluator.clone() {
            Some(evaluator) => {
                tracing::debug!("Evaluating script from {}", url);
                if let Err(err) = evaluator.evaluate(self, &source, &url) {
                    tracing::error!("Script {} failed: {:#}", url, err);
                }
            }
            None => tracing::debug!("No script evaluator, ignoring script from {}", url),
        }
        if external {
            self.fire(script, DomEventType::Load, false, false);
        }
    }

    fn load_image(&mut self, img: NodeId) {
        if !self.config.load_images || !self.dom.has_attribute(img, "src") {
            return;
        }
        self.run_async(move |window: &mut Window| {
            if window.dom.contains_node(img) {
                window.fire(img, DomEventType::Load, false, false);
            }
            Ok(())
        });
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// `location.assign`
    pub fn assign(&mut self, url: &str) -> RuntimeResult<()> {
        self.navigate(url, true)
    }

    /// `location.replace`: navigate without a new history entry
    pub fn replace(&mut self, url: &str) -> RuntimeResult<()> {
        self.navigate(url, false)
    }

    /// `location.reload`
    pub fn reload(&mut self) -> RuntimeResult<()> {
        let href = self.location.href().to_string();
        self.load_document(Request::get(&href))
    }

    /// `history.back`; no-op at the first entry
    pub fn back(&mut self) -> RuntimeResult<()> {
        self.go(-1)
    }

    /// `history.forward`; no-op at the last entry
    pub fn forward(&mut self) -> RuntimeResult<()> {
        self.go(1)
    }

    /// `history.go(delta)`
    pub fn go(&mut self, delta: i32) -> RuntimeResult<()> {
        let Some(url) = self.history.go(delta).map(str::to_string) else {
            return Ok(());
        };
        let target = parse_url(&url)?;
        if self.location.is_same_document(&target) {
            self.change_fragment(target)
        } else {
            self.load_document(Request::get(&url))
        }
    }

    fn navigate(&mut self, url: &str, push: bool) -> RuntimeResult<()> {
        let resolved = self.resolve_url(url)?;
        if resolved.is_empty() {
            return Ok(());
        }
        let target = parse_url(&resolved)?;
        if push {
            self.history.push(target.as_str());
        } else {
            self.history.replace(target.as_str());
        }
        if self.location.is_fragment_change(&target) {
            return self.change_fragment(target);
        }
        self.load_document(Request::get(target.as_str()))
    }

    fn change_fragment(&mut self, target: Url) -> RuntimeResult<()> {
        if target.fragment() == self.location.url().fragment() {
            return Ok(());
        }
        tracing::info!("Hash change to {}", target);
        self.dom.set_url(self.document, target.as_str())?;
        self.location.set(target);
        self.fire(EventTarget::Window, DomEventType::HashChange, false, false);
        Ok(())
    }

    /// Fetch `request` and replace the current document with the result
    ///
    /// Transfer failures load the synthesized error page. A parse failure is
    /// returned after the document has still been completed.
    pub fn load_document(&mut self, request: Request) -> RuntimeResult<()> {
        tracing::info!("Navigating to {} {}", request.method.as_str(), request.url);
        let response = match self.perform(request.clone()) {
            Ok(response) => response,
            Err(err) => Response::network_error(&request.url, &err.to_string()),
        };
        self.load_response(&request.url, response)
    }

    /// Replace the current document with `html`, as if served from `url`
    pub fn load_html(&mut self, url: &str, html: &str) -> RuntimeResult<()> {
        let response =
            Response::ok(html.as_bytes().to_vec()).with_header("Content-Type", "text/html");
        self.load_response(url, response)
    }

    fn load_response(&mut self, url: &str, response: Response) -> RuntimeResult<()> {
        let target = parse_url(url)?;
        self.fire(EventTarget::Window, DomEventType::Unload, false, false);
        if self.history.current() != target.as_str() {
            self.history.push(target.as_str());
        }

        let old = self.document;
        let doc = self.dom.create_document(DocumentKind::Html, target.as_str());
        self.document = doc;
        self.location.set(target);
        self.release_document(old);

        self.dom.set_parsing(doc, true)?;
        let parsed = match self.parser.clone() {
            Some(parser) => parser
                .parse_into(self, &response.text(), doc)
                .map_err(|err| RuntimeError::Parse(format!("{:#}", err))),
            None => Ok(()),
        };
        if let Err(err) = &parsed {
            tracing::error!("{}", err);
        }
        self.ensure_skeleton(doc)?;
        self.dom.set_parsing(doc, false)?;

        self.dom.set_ready_state(doc, ReadyState::Interactive)?;
        self.fire(doc, DomEventType::ReadyStateChange, false, false);
        let mut loaded = Event::new(DomEventType::DOMContentLoaded, true, false);
        if let Err(err) = self.dispatch_event(doc, &mut loaded) {
            tracing::warn!("DOMContentLoaded not delivered: {}", err);
        }
        self.dom.set_ready_state(doc, ReadyState::Complete)?;
        self.fire(doc, DomEventType::ReadyStateChange, false, false);
        self.fire(EventTarget::Window, DomEventType::Load, false, false);
        parsed
    }

    /// Drop a replaced document and everything keyed by its nodes
    fn release_document(&mut self, doc: NodeId) {
        let Some(node) = self.dom.get(doc) else {
            return;
        };
        if node.as_document().is_none() {
            return;
        }
        if let Err(err) = self.discard(doc) {
            tracing::warn!("Could not release document {}: {}", doc, err);
        }
    }
}

fn parse_url(url: &str) -> RuntimeResult<Url> {
    Url::parse(url).map_err(|e| penv_net::NetError::InvalidUrl(format!("{}: {}", url, e)).into())
}
