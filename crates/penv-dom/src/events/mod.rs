//! DOM Events
//!
//! Event objects, the listener registry and the capture/target/bubble
//! dispatch engine.

mod dispatch;
mod listener;

pub use dispatch::{EventContext, dispatch_event};
pub use listener::{CallbackError, EventListener, ListenerRegistry, Propagation};

use crate::{DomError, DomResult, NodeId};

/// Anything listeners can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Node(NodeId),
}

impl From<NodeId> for EventTarget {
    fn from(id: NodeId) -> Self {
        EventTarget::Node(id)
    }
}

impl EventTarget {
    pub fn node(self) -> Option<NodeId> {
        match self {
            EventTarget::Node(id) => Some(id),
            EventTarget::Window => None,
        }
    }
}

/// `Event.eventPhase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum EventPhase {
    /// Not being dispatched
    #[default]
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

/// Event types the environment itself fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEventType {
    // Node mutation events
    DOMNodeInserted,
    DOMNodeRemoved,
    DOMAttrModified,
    DOMCharacterDataModified,

    // Content change
    DOMContentLoaded,

    // Load events
    Load,
    Unload,
    Error,

    // Ready state
    ReadyStateChange,

    // Navigation and forms
    HashChange,
    Submit,
    Click,
}

impl DomEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            DomEventType::DOMNodeInserted => "DOMNodeInserted",
            DomEventType::DOMNodeRemoved => "DOMNodeRemoved",
            DomEventType::DOMAttrModified => "DOMAttrModified",
            DomEventType::DOMCharacterDataModified => "DOMCharacterDataModified",
            DomEventType::DOMContentLoaded => "DOMContentLoaded",
            DomEventType::Load => "load",
            DomEventType::Unload => "unload",
            DomEventType::Error => "error",
            DomEventType::ReadyStateChange => "readystatechange",
            DomEventType::HashChange => "hashchange",
            DomEventType::Submit => "submit",
            DomEventType::Click => "click",
        }
    }
}

impl From<DomEventType> for String {
    fn from(ty: DomEventType) -> Self {
        ty.as_str().to_string()
    }
}

/// `MutationEvent.attrChange`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AttrChange {
    Modification = 1,
    Addition = 2,
    Removal = 3,
}

/// MouseEvent payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseData {
    pub detail: i32,
    pub screen_x: i32,
    pub screen_y: i32,
    pub client_x: i32,
    pub client_y: i32,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
    pub button: u16,
    pub related_target: Option<EventTarget>,
}

/// KeyboardEvent payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyboardData {
    pub key: String,
    pub location: u32,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
    pub repeat: bool,
}

/// MutationEvent payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationData {
    pub related_node: Option<NodeId>,
    pub prev_value: Option<String>,
    pub new_value: Option<String>,
    pub attr_name: Option<String>,
    pub attr_change: Option<AttrChange>,
}

/// Interface-specific event payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventDetail {
    #[default]
    None,
    Ui {
        detail: i32,
    },
    Mouse(MouseData),
    Keyboard(KeyboardData),
    Mutation(MutationData),
}

/// One dispatch occurrence
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub event_type: String,
    /// Set on dispatch, cleared again when dispatch completes
    pub target: Option<EventTarget>,
    pub current_target: Option<EventTarget>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Propagation stopped
    pub cancelled: bool,
    default_prevented: bool,
    /// Milliseconds on the environment clock
    pub time_stamp: u64,
    /// Dispatch sequence number
    pub uuid: Option<u64>,
    pub detail: EventDetail,
}

impl Event {
    /// Plain `Event` with `initEvent` already applied
    pub fn new(event_type: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles,
            cancelable,
            ..Default::default()
        }
    }

    /// `document.createEvent(interface)`: an uninitialized event of the
    /// requested interface
    pub fn create(interface: &str) -> DomResult<Self> {
        let detail = match interface.to_ascii_lowercase().as_str() {
            "event" | "events" | "htmlevents" => EventDetail::None,
            "uievent" | "uievents" => EventDetail::Ui { detail: 0 },
            "mouseevent" | "mouseevents" => EventDetail::Mouse(MouseData::default()),
            "keyboardevent" | "keyboardevents" | "keyevents" => {
                EventDetail::Keyboard(KeyboardData::default())
            }
            "mutationevent" | "mutationevents" => EventDetail::Mutation(MutationData::default()),
            _ => {
                return Err(DomError::NotSupported(format!(
                    "event interface '{}' is not supported",
                    interface
                )));
            }
        };
        Ok(Self {
            detail,
            ..Default::default()
        })
    }

    /// `initEvent`
    pub fn init_event(&mut self, event_type: impl Into<String>, bubbles: bool, cancelable: bool) {
        self.event_type = event_type.into();
        self.bubbles = bubbles;
        self.cancelable = cancelable;
    }

    pub fn ui(event_type: impl Into<String>, bubbles: bool, cancelable: bool, detail: i32) -> Self {
        Self {
            detail: EventDetail::Ui { detail },
            ..Self::new(event_type, bubbles, cancelable)
        }
    }

    /// Mouse events bubble and are cancelable
    pub fn mouse(event_type: impl Into<String>, data: MouseData) -> Self {
        Self {
            detail: EventDetail::Mouse(data),
            ..Self::new(event_type, true, true)
        }
    }

    pub fn keyboard(event_type: impl Into<String>, data: KeyboardData) -> Self {
        Self {
            detail: EventDetail::Keyboard(data),
            ..Self::new(event_type, true, true)
        }
    }

    /// Mutation events bubble and are not cancelable
    pub fn mutation(event_type: DomEventType, data: MutationData) -> Self {
        Self {
            detail: EventDetail::Mutation(data),
            ..Self::new(event_type, true, false)
        }
    }

    /// Create node inserted event
    pub fn node_inserted(parent: NodeId) -> Self {
        Self::mutation(
            DomEventType::DOMNodeInserted,
            MutationData {
                related_node: Some(parent),
                ..Default::default()
            },
        )
    }

    /// Create node removed event
    pub fn node_removed(parent: NodeId) -> Self {
        Self::mutation(
            DomEventType::DOMNodeRemoved,
            MutationData {
                related_node: Some(parent),
                ..Default::default()
            },
        )
    }

    /// Create attribute modified event
    pub fn attr_modified(
        attr: Option<NodeId>,
        name: &str,
        prev_value: Option<&str>,
        new_value: Option<&str>,
        change: AttrChange,
    ) -> Self {
        Self::mutation(
            DomEventType::DOMAttrModified,
            MutationData {
                related_node: attr,
                prev_value: prev_value.map(str::to_string),
                new_value: new_value.map(str::to_string),
                attr_name: Some(name.to_string()),
                attr_change: Some(change),
            },
        )
    }

    /// Create character data modified event
    pub fn char_data_modified(prev_value: &str, new_value: &str) -> Self {
        Self::mutation(
            DomEventType::DOMCharacterDataModified,
            MutationData {
                prev_value: Some(prev_value.to_string()),
                new_value: Some(new_value.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn is(&self, ty: DomEventType) -> bool {
        self.event_type == ty.as_str()
    }

    /// Stop propagation
    ///
    /// Stopping is fused with cancellation: the walk stops and the event no
    /// longer bubbles.
    pub fn stop_propagation(&mut self) {
        self.cancelled = true;
        self.bubbles = false;
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn mutation_data(&self) -> Option<&MutationData> {
        match &self.detail {
            EventDetail::Mutation(data) => Some(data),
            _ => None,
        }
    }
}
