//! Listener Registry
//!
//! Side table from event target to listeners, so nodes never hold their own
//! callbacks. Entries for a node must be purged when the node is discarded.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{Event, EventTarget};

/// Error type returned by script-facing callbacks
pub type CallbackError = anyhow::Error;

/// What a listener asks of the dispatch walk after it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    /// Same as a listener returning `false`: stop the walk
    Stop,
}

type ListenerFn<C> = dyn Fn(&mut C, &mut Event) -> Result<Propagation, CallbackError>;

/// A registered callback; identity is the allocation, so clones compare equal
pub struct EventListener<C> {
    callback: Rc<ListenerFn<C>>,
}

impl<C> Clone for EventListener<C> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<C> fmt::Debug for EventListener<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventListener({:p})", Rc::as_ptr(&self.callback) as *const ())
    }
}

impl<C> EventListener<C> {
    pub fn new(
        callback: impl Fn(&mut C, &mut Event) -> Result<Propagation, CallbackError> + 'static,
    ) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, ctx: &mut C, event: &mut Event) -> Result<Propagation, CallbackError> {
        (self.callback)(ctx, event)
    }

    /// Same underlying function
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }
}

struct TypeListeners<C> {
    capturing: Vec<EventListener<C>>,
    bubbling: Vec<EventListener<C>>,
}

impl<C> Default for TypeListeners<C> {
    fn default() -> Self {
        Self {
            capturing: Vec::new(),
            bubbling: Vec::new(),
        }
    }
}

impl<C> TypeListeners<C> {
    fn phase(&self, use_capture: bool) -> &Vec<EventListener<C>> {
        if use_capture { &self.capturing } else { &self.bubbling }
    }

    fn phase_mut(&mut self, use_capture: bool) -> &mut Vec<EventListener<C>> {
        if use_capture {
            &mut self.capturing
        } else {
            &mut self.bubbling
        }
    }

    fn is_empty(&self) -> bool {
        self.capturing.is_empty() && self.bubbling.is_empty()
    }
}

/// Per-environment listener registry
pub struct ListenerRegistry<C> {
    listeners: HashMap<EventTarget, HashMap<String, TypeListeners<C>>>,
    /// `on<type>` property handlers
    handlers: HashMap<EventTarget, HashMap<String, EventListener<C>>>,
    next_uuid: u64,
}

impl<C> Default for ListenerRegistry<C> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
            handlers: HashMap::new(),
            next_uuid: 0,
        }
    }
}

impl<C> fmt::Debug for ListenerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("targets", &self.listeners.len())
            .field("handlers", &self.handlers.len())
            .field("next_uuid", &self.next_uuid)
            .finish()
    }
}

impl<C> ListenerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `addEventListener`; registering the same function and phase twice is
    /// a no-op
    pub fn add(
        &mut self,
        target: EventTarget,
        event_type: &str,
        listener: EventListener<C>,
        use_capture: bool,
    ) {
        let list = self
            .listeners
            .entry(target)
            .or_default()
            .entry(event_type.to_string())
            .or_default()
            .phase_mut(use_capture);
        if !list.iter().any(|l| l.same(&listener)) {
            list.push(listener);
        }
    }

    /// `removeEventListener`; returns whether anything was removed
    pub fn remove(
        &mut self,
        target: EventTarget,
        event_type: &str,
        listener: &EventListener<C>,
        use_capture: bool,
    ) -> bool {
        let Some(types) = self.listeners.get_mut(&target) else {
            return false;
        };
        let Some(entry) = types.get_mut(event_type) else {
            return false;
        };
        let list = entry.phase_mut(use_capture);
        let before = list.len();
        list.retain(|l| !l.same(listener));
        let removed = list.len() != before;
        if entry.is_empty() {
            types.remove(event_type);
        }
        if types.is_empty() {
            self.listeners.remove(&target);
        }
        removed
    }

    /// Drop every listener of `event_type` on `target`; `"*"` drops all
    /// listeners and property handlers of the target
    pub fn remove_all(&mut self, target: EventTarget, event_type: &str) {
        if event_type == "*" {
            self.listeners.remove(&target);
            self.handlers.remove(&target);
            return;
        }
        if let Some(types) = self.listeners.get_mut(&target) {
            types.remove(event_type);
            if types.is_empty() {
                self.listeners.remove(&target);
            }
        }
    }

    /// Set or clear the `on<type>` property handler
    pub fn set_handler(
        &mut self,
        target: EventTarget,
        event_type: &str,
        handler: Option<EventListener<C>>,
    ) {
        match handler {
            Some(handler) => {
                self.handlers
                    .entry(target)
                    .or_default()
                    .insert(event_type.to_string(), handler);
            }
            None => {
                if let Some(map) = self.handlers.get_mut(&target) {
                    map.remove(event_type);
                    if map.is_empty() {
                        self.handlers.remove(&target);
                    }
                }
            }
        }
    }

    pub fn handler(&self, target: EventTarget, event_type: &str) -> Option<EventListener<C>> {
        self.handlers.get(&target)?.get(event_type).cloned()
    }

    pub fn has_listeners(&self, target: EventTarget, event_type: &str, use_capture: bool) -> bool {
        self.listeners
            .get(&target)
            .and_then(|types| types.get(event_type))
            .is_some_and(|entry| !entry.phase(use_capture).is_empty())
    }

    /// True if any target has a listener or handler for `event_type`
    pub fn has_any(&self, event_type: &str) -> bool {
        self.listeners.values().any(|types| types.contains_key(event_type))
            || self
                .handlers
                .values()
                .any(|map| map.contains_key(event_type))
    }

    /// Listeners to invoke for one target and phase, frozen at this moment
    pub fn snapshot(
        &self,
        target: EventTarget,
        event_type: &str,
        use_capture: bool,
    ) -> Vec<EventListener<C>> {
        self.listeners
            .get(&target)
            .and_then(|types| types.get(event_type))
            .map(|entry| entry.phase(use_capture).clone())
            .unwrap_or_default()
    }

    /// Number of targets with registered listeners or handlers
    pub fn target_count(&self) -> usize {
        let mut count = self.listeners.len();
        count += self
            .handlers
            .keys()
            .filter(|t| !self.listeners.contains_key(t))
            .count();
        count
    }

    pub(crate) fn next_dispatch_id(&mut self) -> u64 {
        self.next_uuid += 1;
        self.next_uuid
    }
}
