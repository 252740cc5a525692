//! Event Dispatch
//!
//! Capture walk root to target, then the target itself, then the bubble walk
//! back up. Listener lists are snapshotted per node and phase when that node
//! is reached, so registrations made during dispatch take effect for the
//! next dispatch.

use super::{Event, EventListener, EventPhase, EventTarget, ListenerRegistry, Propagation};
use crate::{DomTree, EventError};

/// The environment an event is dispatched in
pub trait EventContext: Sized {
    fn dom(&self) -> &DomTree;

    fn listeners(&self) -> &ListenerRegistry<Self>;

    fn listeners_mut(&mut self) -> &mut ListenerRegistry<Self>;

    /// Propagation parent of a target (the node's parent by default)
    fn parent_target(&self, target: EventTarget) -> Option<EventTarget> {
        match target {
            EventTarget::Node(id) => self.dom().parent_node(id).map(EventTarget::Node),
            EventTarget::Window => None,
        }
    }

    /// Clock reading used for `Event.time_stamp`
    fn timestamp(&self) -> u64 {
        0
    }

    /// Default behaviour for an event that was not `preventDefault`-ed
    fn default_action(&mut self, _event: &mut Event) {}
}

/// `dispatchEvent`: returns `false` if a listener called `preventDefault`
pub fn dispatch_event<C: EventContext>(
    ctx: &mut C,
    target: EventTarget,
    event: &mut Event,
) -> Result<bool, EventError> {
    if event.event_type.is_empty() {
        return Err(EventError::UnspecifiedEventType(
            "event type was not initialized".into(),
        ));
    }
    if let EventTarget::Node(id) = target {
        if !ctx.dom().contains_node(id) {
            return Err(EventError::UnspecifiedEventType(format!(
                "target {} is neither a node nor the window",
                id
            )));
        }
    }

    event.target.get_or_insert(target);
    event.uuid = Some(ctx.listeners_mut().next_dispatch_id());
    if event.time_stamp == 0 {
        event.time_stamp = ctx.timestamp();
    }
    tracing::debug!("Dispatching '{}' at {:?}", event.event_type, target);

    // Nearest ancestor first
    let mut path = Vec::new();
    let mut cursor = ctx.parent_target(target);
    while let Some(ancestor) = cursor {
        path.push(ancestor);
        cursor = ctx.parent_target(ancestor);
    }

    event.phase = EventPhase::Capturing;
    for &ancestor in path.iter().rev() {
        if event.cancelled {
            break;
        }
        if !ctx.listeners().has_listeners(ancestor, &event.event_type, true) {
            continue;
        }
        let listeners = ctx.listeners().snapshot(ancestor, &event.event_type, true);
        invoke(ctx, ancestor, event, &listeners);
    }

    if !event.cancelled {
        event.phase = EventPhase::AtTarget;
        let mut listeners = ctx.listeners().snapshot(target, &event.event_type, true);
        listeners.extend(ctx.listeners().snapshot(target, &event.event_type, false));
        listeners.extend(ctx.listeners().handler(target, &event.event_type));
        invoke(ctx, target, event, &listeners);
    }

    if event.bubbles && !event.cancelled {
        event.phase = EventPhase::Bubbling;
        for &ancestor in &path {
            if event.cancelled {
                break;
            }
            let mut listeners = ctx.listeners().snapshot(ancestor, &event.event_type, false);
            listeners.extend(ctx.listeners().handler(ancestor, &event.event_type));
            if listeners.is_empty() {
                continue;
            }
            invoke(ctx, ancestor, event, &listeners);
        }
    }

    if !event.is_default_prevented() {
        event.current_target = Some(target);
        ctx.default_action(event);
    }

    event.phase = EventPhase::None;
    event.current_target = None;
    event.target = None;
    Ok(!event.is_default_prevented())
}

/// Run every listener of one node; failures are logged and swallowed
fn invoke<C: EventContext>(
    ctx: &mut C,
    current: EventTarget,
    event: &mut Event,
    listeners: &[EventListener<C>],
) {
    event.current_target = Some(current);
    for listener in listeners {
        match listener.call(ctx, event) {
            Ok(Propagation::Continue) => {}
            Ok(Propagation::Stop) => event.stop_propagation(),
            Err(err) => {
                tracing::error!(
                    "Listener for '{}' on {:?} failed: {:#}",
                    event.event_type,
                    current,
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventListener;
    use crate::{DocumentKind, NodeId};

    #[derive(Default)]
    struct Env {
        dom: DomTree,
        listeners: ListenerRegistry<Env>,
        log: Vec<String>,
        defaults: usize,
    }

    impl EventContext for Env {
        fn dom(&self) -> &DomTree {
            &self.dom
        }

        fn listeners(&self) -> &ListenerRegistry<Self> {
            &self.listeners
        }

        fn listeners_mut(&mut self) -> &mut ListenerRegistry<Self> {
            &mut self.listeners
        }

        fn default_action(&mut self, _event: &mut Event) {
            self.defaults += 1;
        }
    }

    fn recorder(label: &'static str) -> EventListener<Env> {
        EventListener::new(move |env: &mut Env, event: &mut Event| {
            env.log.push(format!("{}:{}", label, event.phase as u16));
            Ok(Propagation::Continue)
        })
    }

    fn chain(env: &mut Env) -> (NodeId, NodeId, NodeId) {
        let doc = env.dom.create_document(DocumentKind::Html, "about:blank");
        let grandparent = env.dom.create_element(doc, "div").unwrap();
        let parent = env.dom.create_element(doc, "p").unwrap();
        let child = env.dom.create_element(doc, "span").unwrap();
        env.dom.append_child(grandparent, parent).unwrap();
        env.dom.append_child(parent, child).unwrap();
        (grandparent, parent, child)
    }

    #[test]
    fn test_uninitialized_event_rejected() {
        let mut env = Env::default();
        let mut event = Event::default();
        let err = dispatch_event(&mut env, EventTarget::Window, &mut event).unwrap_err();
        assert_eq!(err.code(), 0);
    }

    #[test]
    fn test_missing_target_rejected() {
        let mut env = Env::default();
        let mut event = Event::new("click", true, true);
        assert!(dispatch_event(&mut env, EventTarget::Node(NodeId(42)), &mut event).is_err());
    }

    #[test]
    fn test_phase_order() {
        let mut env = Env::default();
        let (grandparent, parent, child) = chain(&mut env);
        env.listeners.add(grandparent.into(), "click", recorder("grandparent"), true);
        env.listeners.add(parent.into(), "click", recorder("parent"), false);
        env.listeners.add(child.into(), "click", recorder("child"), false);

        let mut event = Event::new("click", true, true);
        assert!(dispatch_event(&mut env, child.into(), &mut event).unwrap());
        assert_eq!(env.log, vec!["grandparent:1", "child:2", "parent:3"]);
        assert_eq!(event.target, None);
        assert_eq!(event.phase, EventPhase::None);
        assert_eq!(env.defaults, 1);
    }

    #[test]
    fn test_capture_stop_blocks_bubble() {
        let mut env = Env::default();
        let (grandparent, parent, child) = chain(&mut env);
        env.listeners.add(
            grandparent.into(),
            "click",
            EventListener::new(|_, _| Ok(Propagation::Stop)),
            true,
        );
        env.listeners.add(parent.into(), "click", recorder("parent"), false);
        env.listeners.add(child.into(), "click", recorder("child"), false);

        let mut event = Event::new("click", true, true);
        dispatch_event(&mut env, child.into(), &mut event).unwrap();
        assert!(env.log.is_empty());
        assert!(event.cancelled);
    }

    #[test]
    fn test_non_bubbling_event() {
        let mut env = Env::default();
        let (_, parent, child) = chain(&mut env);
        env.listeners.add(parent.into(), "focus", recorder("parent"), false);
        env.listeners.add(child.into(), "focus", recorder("child"), false);

        let mut event = Event::new("focus", false, false);
        dispatch_event(&mut env, child.into(), &mut event).unwrap();
        assert_eq!(env.log, vec!["child:2"]);
    }

    #[test]
    fn test_failing_listener_is_swallowed() {
        let mut env = Env::default();
        let (_, _, child) = chain(&mut env);
        env.listeners.add(
            child.into(),
            "click",
            EventListener::new(|_, _| Err(anyhow::anyhow!("script error"))),
            false,
        );
        env.listeners.add(child.into(), "click", recorder("after"), false);

        let mut event = Event::new("click", true, true);
        assert!(dispatch_event(&mut env, child.into(), &mut event).is_ok());
        assert_eq!(env.log, vec!["after:2"]);
    }

    #[test]
    fn test_prevent_default_skips_default_action() {
        let mut env = Env::default();
        let (_, parent, child) = chain(&mut env);
        env.listeners.add(
            parent.into(),
            "submit",
            EventListener::new(|_, event: &mut Event| {
                event.prevent_default();
                Ok(Propagation::Continue)
            }),
            false,
        );
        let mut event = Event::new("submit", true, true);
        assert!(!dispatch_event(&mut env, child.into(), &mut event).unwrap());
        assert_eq!(env.defaults, 0);
    }

    #[test]
    fn test_property_handler_runs_after_listeners() {
        let mut env = Env::default();
        let (_, parent, child) = chain(&mut env);
        env.listeners.set_handler(child.into(), "click", Some(recorder("onclick")));
        env.listeners.add(child.into(), "click", recorder("listener"), false);
        env.listeners.set_handler(parent.into(), "click", Some(recorder("parent-onclick")));

        let mut event = Event::new("click", true, true);
        dispatch_event(&mut env, child.into(), &mut event).unwrap();
        assert_eq!(env.log, vec!["listener:2", "onclick:2", "parent-onclick:3"]);
    }

    #[test]
    fn test_listener_added_during_dispatch_waits() {
        let mut env = Env::default();
        let (_, _, child) = chain(&mut env);
        let target: EventTarget = child.into();
        env.listeners.add(
            target,
            "click",
            EventListener::new(move |env: &mut Env, _event: &mut Event| {
                env.listeners.add(target, "click", recorder("late"), false);
                Ok(Propagation::Continue)
            }),
            false,
        );

        let mut event = Event::new("click", true, true);
        dispatch_event(&mut env, target, &mut event).unwrap();
        assert!(env.log.is_empty());
        let mut event = Event::new("click", true, true);
        dispatch_event(&mut env, target, &mut event).unwrap();
        assert_eq!(env.log, vec!["late:2"]);
    }
}
