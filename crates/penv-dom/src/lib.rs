//! penv DOM - Document Object Model
//!
//! Arena-backed DOM Level 2 Core tree with a Level 2 Events dispatch engine.
//!
//! Every node of every document lives in one [`DomTree`] and is addressed by a
//! [`NodeId`] handle. Parent and sibling links are handles (non-owning), the
//! child list is the only owning edge, so the tree has no reference cycles.

mod attributes;
mod character_data;
mod clone;
mod document;
mod error;
mod mutation;
mod named_node_map;
mod names;
mod node;
mod node_list;
mod position;
mod serialize;
mod tree;

pub mod events;

pub use error::{DomError, DomResult, EventError};
pub use named_node_map::NamedNodeMap;
pub use names::{QualName, XHTML_NAMESPACE, XMLNS_NAMESPACE, XML_NAMESPACE};
pub use node::{
    AttrData, DocumentData, DocumentKind, ElementData, Node, NodeData, NodeType, ReadyState,
};
pub use node_list::NodeList;
pub use position::DocumentPosition;
pub use tree::{Ancestors, DomImplementation, DomTree};

use std::fmt;

/// Node identifier (index into arena)
///
/// Handles are never reused within a tree, so a handle to a discarded node
/// stays invalid instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
