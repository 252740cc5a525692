//! Window
//!
//! The environment object. It owns the DOM arena, the current document, the
//! listener registry, the scheduler and the I/O collaborators; events are
//! dispatched in it and timers fire against it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use penv_dom::events::{
    AttrChange, CallbackError, DomEventType, Event, EventContext, EventListener, EventTarget,
    ListenerRegistry, dispatch_event,
};
use penv_dom::{
    DocumentKind, DomImplementation, DomTree, EventError, NodeId, NodeType,
    ReadyState, XHTML_NAMESPACE,
};
use penv_net::{
    Connection, CookieJar, DefaultConnection, FileStore, LocalFileStore, NetError, Request,
    Response, Url, resolve_uri,
};

use crate::timers::{self, Scheduler, TimerContext};
use crate::{
    Clock, Config, Console, History, Html5everParser, HtmlParser, Location, RuntimeResult,
    ScriptEvaluator, SystemClock, XmlHttpRequest,
};

/// Runs for every element connected to the window's document outside of parsing
pub type InsertHook = Rc<dyn Fn(&mut Window, NodeId) -> Result<(), CallbackError>>;

/// Behaviour for an event type that was not `preventDefault`-ed
pub type DefaultAction = Rc<dyn Fn(&mut Window, &Event) -> Result<(), CallbackError>>;

/// Window builder
pub struct WindowBuilder {
    config: Config,
    clock: Option<Box<dyn Clock>>,
    connection: Option<Box<dyn Connection>>,
    files: Option<Box<dyn FileStore>>,
    parser: Option<Rc<dyn HtmlParser>>,
    evaluator: Option<Rc<dyn ScriptEvaluator>>,
    use_default_parser: bool,
}

impl WindowBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            clock: None,
            connection: None,
            files: None,
            parser: None,
            evaluator: None,
            use_default_parser: true,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn connection(mut self, connection: impl Connection + 'static) -> Self {
        self.connection = Some(Box::new(connection));
        self
    }

    pub fn file_store(mut self, files: impl FileStore + 'static) -> Self {
        self.files = Some(Box::new(files));
        self
    }

    pub fn parser(mut self, parser: impl HtmlParser + 'static) -> Self {
        self.parser = Some(Rc::new(parser));
        self
    }

    /// Build without any HTML parser; loaded documents stay empty
    pub fn without_parser(mut self) -> Self {
        self.parser = None;
        self.use_default_parser = false;
        self
    }

    pub fn evaluator(mut self, evaluator: impl ScriptEvaluator + 'static) -> Self {
        self.evaluator = Some(Rc::new(evaluator));
        self
    }

    pub fn build(self) -> RuntimeResult<Window> {
        let config = self.config;
        let files = self
            .files
            .unwrap_or_else(|| Box::new(LocalFileStore));
        let cookies = match &config.cookie_file {
            Some(path) => CookieJar::load(files.as_ref(), path)?,
            None => CookieJar::new(),
        };
        let connection = self
            .connection
            .unwrap_or_else(|| Box::new(DefaultConnection::new(&config.user_agent)));
        let parser = match self.parser {
            Some(parser) => Some(parser),
            None if self.use_default_parser => Some(Rc::new(Html5everParser) as Rc<dyn HtmlParser>),
            None => None,
        };

        let mut dom = DomTree::with_implementation(DomImplementation {
            error_checking: config.error_checking,
        });
        let document = dom.create_document(DocumentKind::Html, "about:blank");

        let mut window = Window {
            dom,
            document,
            listeners: ListenerRegistry::new(),
            scheduler: Scheduler::with_limits(
                config.min_timer_ms,
                config.min_interval_ms,
                config.wait_interval_ms,
            ),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            connection,
            files,
            cookies,
            location: Location::parse("about:blank")?,
            history: History::new("about:blank"),
            config,
            parser,
            evaluator: self.evaluator,
            insert_hooks: Vec::new(),
            default_actions: HashMap::new(),
            xhrs: Vec::new(),
            executed_scripts: HashSet::new(),
            console: Console,
        };
        window.ensure_skeleton(document)?;
        window.dom.set_ready_state(document, ReadyState::Complete)?;
        window.install_default_actions();
        tracing::debug!("Window created");
        Ok(window)
    }
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser window
pub struct Window {
    pub(crate) dom: DomTree,
    pub(crate) document: NodeId,
    pub(crate) listeners: ListenerRegistry<Window>,
    pub(crate) scheduler: Scheduler<Window>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) connection: Box<dyn Connection>,
    pub(crate) files: Box<dyn FileStore>,
    pub(crate) cookies: CookieJar,
    pub(crate) location: Location,
    pub(crate) history: History,
    pub(crate) config: Config,
    pub(crate) parser: Option<Rc<dyn HtmlParser>>,
    pub(crate) evaluator: Option<Rc<dyn ScriptEvaluator>>,
    pub(crate) insert_hooks: Vec<InsertHook>,
    pub(crate) default_actions: HashMap<String, DefaultAction>,
    pub(crate) xhrs: Vec<Option<XmlHttpRequest>>,
    /// Scripts already handed to the evaluator
    pub(crate) executed_scripts: HashSet<NodeId>,
    console: Console,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("location", &self.location.href())
            .field("document", &self.document)
            .field("nodes", &self.dom.len())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Window with default collaborators
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> WindowBuilder {
        WindowBuilder::new()
    }

    pub fn dom(&self) -> &DomTree {
        &self.dom
    }

    /// Direct tree access; changes made here fire no mutation events
    pub fn dom_mut(&mut self) -> &mut DomTree {
        &mut self.dom
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Current reading of the environment clock
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Resolve `path` against the document URL (`""` for `javascript:`)
    pub fn resolve_url(&self, path: &str) -> RuntimeResult<String> {
        let base = self.dom.url(self.document)?;
        Ok(resolve_uri(path, Some(base))?)
    }

    /// Lower-case local name of an HTML element, `None` for anything else
    pub(crate) fn html_tag(&self, node: NodeId) -> Option<String> {
        let element = self.dom.get(node)?.as_element()?;
        match element.name.namespace() {
            None | Some(XHTML_NAMESPACE) => Some(element.name.local.to_ascii_lowercase()),
            Some(_) => None,
        }
    }

    /// `<html><head/><body/></html>` for a document without an element
    pub(crate) fn ensure_skeleton(&mut self, doc: NodeId) -> RuntimeResult<()> {
        if self.dom.document_element(doc).is_some() {
            return Ok(());
        }
        let html = self.dom.create_element(doc, "html")?;
        let head = self.dom.create_element(doc, "head")?;
        let body = self.dom.create_element(doc, "body")?;
        self.dom.append_child(html, head)?;
        self.dom.append_child(html, body)?;
        self.dom.append_child(doc, html)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(
        &mut self,
        target: impl Into<EventTarget>,
        event_type: &str,
        listener: EventListener<Window>,
        use_capture: bool,
    ) {
        self.listeners
            .add(target.into(), event_type, listener, use_capture);
    }

    pub fn remove_event_listener(
        &mut self,
        target: impl Into<EventTarget>,
        event_type: &str,
        listener: &EventListener<Window>,
        use_capture: bool,
    ) -> bool {
        self.listeners
            .remove(target.into(), event_type, listener, use_capture)
    }

    /// `on<type>` property handler; `None` clears it
    pub fn set_event_handler(
        &mut self,
        target: impl Into<EventTarget>,
        event_type: &str,
        handler: Option<EventListener<Window>>,
    ) {
        self.listeners.set_handler(target.into(), event_type, handler);
    }

    pub fn listeners(&self) -> &ListenerRegistry<Window> {
        &self.listeners
    }

    /// `dispatchEvent`: `false` if a listener called `preventDefault`
    pub fn dispatch_event(
        &mut self,
        target: impl Into<EventTarget>,
        event: &mut Event,
    ) -> Result<bool, EventError> {
        dispatch_event(self, target.into(), event)
    }

    /// Dispatch a plain event, logging instead of failing
    pub(crate) fn fire(
        &mut self,
        target: impl Into<EventTarget>,
        event_type: impl Into<String>,
        bubbles: bool,
        cancelable: bool,
    ) -> bool {
        let mut event = Event::new(event_type, bubbles, cancelable);
        self.dispatch_logged(target.into(), &mut event)
    }

    fn dispatch_logged(&mut self, target: EventTarget, event: &mut Event) -> bool {
        match dispatch_event(self, target, event) {
            Ok(not_prevented) => not_prevented,
            Err(err) => {
                tracing::warn!("Dropped '{}' event: {}", event.event_type, err);
                true
            }
        }
    }

    /// Replace the default action for `event_type`
    pub fn set_default_action(
        &mut self,
        event_type: &str,
        action: impl Fn(&mut Window, &Event) -> Result<(), CallbackError> + 'static,
    ) {
        self.default_actions
            .insert(event_type.to_string(), Rc::new(action));
    }

    pub fn clear_default_action(&mut self, event_type: &str) -> bool {
        self.default_actions.remove(event_type).is_some()
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    pub fn set_timeout(
        &mut self,
        callback: impl Fn(&mut Window) -> Result<(), CallbackError> + 'static,
        delay_ms: i64,
    ) -> usize {
        let now = self.clock.now_ms();
        self.scheduler.set_timeout(now, delay_ms, callback)
    }

    pub fn set_interval(
        &mut self,
        callback: impl Fn(&mut Window) -> Result<(), CallbackError> + 'static,
        period_ms: i64,
    ) -> usize {
        let now = self.clock.now_ms();
        self.scheduler.set_interval(now, period_ms, callback)
    }

    pub fn clear_timeout(&mut self, handle: usize) {
        self.scheduler.clear(handle);
    }

    pub fn clear_interval(&mut self, handle: usize) {
        self.scheduler.clear(handle);
    }

    /// Run `callback` from the event loop as soon as possible
    pub fn run_async(
        &mut self,
        callback: impl Fn(&mut Window) -> Result<(), CallbackError> + 'static,
    ) -> usize {
        self.set_timeout(callback, 0)
    }

    /// Drive the event loop, see [`timers::wait`]
    pub fn wait(&mut self, budget: Option<i64>) -> usize {
        timers::wait(self, budget)
    }

    pub fn scheduler(&self) -> &Scheduler<Window> {
        &self.scheduler
    }

    // ------------------------------------------------------------------
    // Mutations with events
    // ------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, new_child: NodeId) -> RuntimeResult<NodeId> {
        self.insert_before(parent, new_child, None)
    }

    /// `insertBefore`, then `DOMNodeInserted` and insert hooks per inserted node
    ///
    /// Moving an attached node first reports its removal from the old parent.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: Option<NodeId>,
    ) -> RuntimeResult<NodeId> {
        self.dom.check_insert(parent, new_child, reference)?;
        let inserted = self.inserted_nodes(new_child)?;
        if reference != Some(new_child) {
            self.before_move(new_child);
        }
        self.dom.insert_before(parent, new_child, reference)?;
        for node in inserted {
            self.after_insert(parent, node);
        }
        Ok(new_child)
    }

    /// `replaceChild`: returns the replaced node
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> RuntimeResult<NodeId> {
        self.dom.check_replace(parent, new_child, old_child)?;
        let inserted = self.inserted_nodes(new_child)?;
        if new_child != old_child {
            self.before_move(new_child);
            self.before_remove(parent, old_child);
        }
        let old = self.dom.replace_child(parent, new_child, old_child)?;
        for node in inserted {
            self.after_insert(parent, node);
        }
        Ok(old)
    }

    /// `removeChild`, with `DOMNodeRemoved` fired while still attached
    pub fn remove_child(&mut self, parent: NodeId, old_child: NodeId) -> RuntimeResult<NodeId> {
        self.dom.check_remove(parent, old_child)?;
        self.before_remove(parent, old_child);
        Ok(self.dom.remove_child(parent, old_child)?)
    }

    /// `setAttribute` plus `DOMAttrModified`; returns the previous value
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: &str,
    ) -> RuntimeResult<Option<String>> {
        let previous = self.dom.set_attribute(element, name, value)?;
        if self.listeners.has_any(DomEventType::DOMAttrModified.as_str()) {
            let attr = self.dom.get_attribute_node(element, name);
            let change = if previous.is_some() {
                AttrChange::Modification
            } else {
                AttrChange::Addition
            };
            let mut event =
                Event::attr_modified(attr, name, previous.as_deref(), Some(value), change);
            self.dispatch_logged(element.into(), &mut event);
        }
        Ok(previous)
    }

    /// `removeAttribute` plus `DOMAttrModified`; returns the removed value
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> RuntimeResult<Option<String>> {
        let previous = self.dom.remove_attribute(element, name)?;
        if let Some(prev) = previous.as_deref() {
            if self.listeners.has_any(DomEventType::DOMAttrModified.as_str()) {
                let mut event =
                    Event::attr_modified(None, name, Some(prev), None, AttrChange::Removal);
                self.dispatch_logged(element.into(), &mut event);
            }
        }
        Ok(previous)
    }

    /// `CharacterData.data` setter plus `DOMCharacterDataModified`
    pub fn set_data(&mut self, node: NodeId, data: &str) -> RuntimeResult<()> {
        let previous = self.dom.data(node)?.to_string();
        self.dom.set_data(node, data)?;
        if self
            .listeners
            .has_any(DomEventType::DOMCharacterDataModified.as_str())
        {
            let mut event = Event::char_data_modified(&previous, data);
            self.dispatch_logged(node.into(), &mut event);
        }
        Ok(())
    }

    /// Free a detached subtree and everything keyed by its nodes
    pub fn discard(&mut self, node: NodeId) -> RuntimeResult<usize> {
        let freed = self.dom.discard(node)?;
        for id in &freed {
            self.listeners.remove_all(EventTarget::Node(*id), "*");
            self.executed_scripts.remove(id);
        }
        Ok(freed.len())
    }

    /// Custom behaviour appended after the built-in element behaviours
    pub fn add_insert_hook(
        &mut self,
        hook: impl Fn(&mut Window, NodeId) -> Result<(), CallbackError> + 'static,
    ) {
        self.insert_hooks.push(Rc::new(hook));
    }

    fn inserted_nodes(&self, new_child: NodeId) -> RuntimeResult<Vec<NodeId>> {
        Ok(match self.dom.node_type(new_child)? {
            NodeType::DocumentFragment => self.dom.children(new_child).to_vec(),
            _ => vec![new_child],
        })
    }

    fn before_remove(&mut self, parent: NodeId, child: NodeId) {
        if self.dom.parent_node(child) != Some(parent) {
            return;
        }
        if self.listeners.has_any(DomEventType::DOMNodeRemoved.as_str()) {
            let mut event = Event::node_removed(parent);
            self.dispatch_logged(child.into(), &mut event);
        }
    }

    /// `DOMNodeRemoved` for the implicit removal of an attached node
    fn before_move(&mut self, node: NodeId) {
        if self.dom.node_type(node).ok() == Some(NodeType::DocumentFragment) {
            return;
        }
        if let Some(old_parent) = self.dom.parent_node(node) {
            self.before_remove(old_parent, node);
        }
    }

    fn after_insert(&mut self, parent: NodeId, node: NodeId) {
        if self.listeners.has_any(DomEventType::DOMNodeInserted.as_str()) {
            let mut event = Event::node_inserted(parent);
            self.dispatch_logged(node.into(), &mut event);
        }
        if self.dom.connected_document(node) != Some(self.document)
            || self.dom.is_parsing(self.document)
        {
            return;
        }
        let mut elements = vec![node];
        elements.extend(self.dom.descendants(node));
        for element in elements {
            if self.dom.get(element).is_some_and(|n| n.is_element()) {
                self.element_inserted(element);
            }
        }
    }

    // ------------------------------------------------------------------
    // I/O
    // ------------------------------------------------------------------

    /// Perform `request` with `User-Agent` and `Cookie` filled in, capturing
    /// `Set-Cookie` from the response
    pub(crate) fn perform(&mut self, mut request: Request) -> Result<Response, NetError> {
        if request.header("User-Agent").is_none() {
            request = request.with_header("User-Agent", &self.config.user_agent);
        }
        let url = Url::parse(&request.url).ok();
        if let Some(url) = &url {
            if let Some(cookie) = self.cookies.cookies_for(url) {
                request = request.with_header("Cookie", &cookie);
            }
        }

        let response = self.connection.perform(&request)?;

        if let Some(url) = &url {
            let mut stored = false;
            for header in response.header_values("Set-Cookie") {
                match self.cookies.set_cookie(url, header) {
                    Ok(()) => stored = true,
                    Err(err) => tracing::warn!("Ignoring cookie from {}: {}", url, err),
                }
            }
            if stored {
                self.persist_cookies();
            }
        }
        Ok(response)
    }

    /// Write the cookie jar to `cookie_file`, if configured
    pub fn persist_cookies(&self) {
        let Some(path) = &self.config.cookie_file else {
            return;
        };
        if let Err(err) = self.cookies.save(self.files.as_ref(), path) {
            tracing::warn!("Failed to save cookies to {}: {}", path, err);
        }
    }
}

impl EventContext for Window {
    fn dom(&self) -> &DomTree {
        &self.dom
    }

    fn listeners(&self) -> &ListenerRegistry<Self> {
        &self.listeners
    }

    fn listeners_mut(&mut self) -> &mut ListenerRegistry<Self> {
        &mut self.listeners
    }

    /// The document propagates to the window
    fn parent_target(&self, target: EventTarget) -> Option<EventTarget> {
        match target {
            EventTarget::Node(id) if id == self.document => Some(EventTarget::Window),
            EventTarget::Node(id) => self.dom.parent_node(id).map(EventTarget::Node),
            EventTarget::Window => None,
        }
    }

    fn timestamp(&self) -> u64 {
        self.clock.now_ms()
    }

    fn default_action(&mut self, event: &mut Event) {
        let Some(action) = self.default_actions.get(&event.event_type).cloned() else {
            return;
        };
        if let Err(err) = action(self, event) {
            tracing::error!("Default action for '{}' failed: {:#}", event.event_type, err);
        }
    }
}

impl TimerContext for Window {
    fn scheduler(&self) -> &Scheduler<Self> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<Self> {
        &mut self.scheduler
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
