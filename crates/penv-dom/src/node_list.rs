//! NodeList
//!
//! Child lists and tag-name collections are stored as queries and evaluated
//! against the tree on every access, so they always reflect the current
//! structure. `Static` holds a point-in-time snapshot.

use crate::{DomTree, NodeId};

/// `NodeList`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeList {
    /// `childNodes` of a node
    Children(NodeId),
    /// `getElementsByTagName(name)` under `root`
    TagName { root: NodeId, name: String },
    /// `getElementsByTagNameNS(namespace, local)` under `root`
    TagNameNs {
        root: NodeId,
        namespace: Option<String>,
        local: String,
    },
    /// Snapshot
    Static(Vec<NodeId>),
}

impl NodeList {
    /// Evaluate the list in document order
    pub fn to_vec(&self, tree: &DomTree) -> Vec<NodeId> {
        match self {
            NodeList::Children(parent) => tree.children(*parent).to_vec(),
            NodeList::Static(nodes) => nodes
                .iter()
                .copied()
                .filter(|&n| tree.contains_node(n))
                .collect(),
            NodeList::TagName { root, .. } | NodeList::TagNameNs { root, .. } => tree
                .descendants(*root)
                .into_iter()
                .filter(|&n| self.matches(tree, n))
                .collect(),
        }
    }

    pub fn length(&self, tree: &DomTree) -> usize {
        match self {
            NodeList::Children(parent) => tree.children(*parent).len(),
            _ => self.to_vec(tree).len(),
        }
    }

    /// `item(index)`; `None` past the end
    pub fn item(&self, tree: &DomTree, index: usize) -> Option<NodeId> {
        match self {
            NodeList::Children(parent) => tree.children(*parent).get(index).copied(),
            NodeList::TagName { root, .. } | NodeList::TagNameNs { root, .. } => tree
                .descendants(*root)
                .into_iter()
                .filter(|&n| self.matches(tree, n))
                .nth(index),
            NodeList::Static(_) => self.to_vec(tree).get(index).copied(),
        }
    }

    /// Freeze the current contents
    pub fn snapshot(&self, tree: &DomTree) -> NodeList {
        NodeList::Static(self.to_vec(tree))
    }

    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(element) = tree.get(node).and_then(|n| n.as_element()) else {
            return false;
        };
        match self {
            NodeList::TagName { name, .. } => {
                if name == "*" {
                    true
                } else if tree.is_html(node) {
                    element.name.qualified().eq_ignore_ascii_case(name)
                } else {
                    element.name.matches_qualified(name)
                }
            }
            NodeList::TagNameNs {
                namespace, local, ..
            } => {
                let namespace_ok = namespace.as_deref() == Some("*")
                    || element.name.namespace() == namespace.as_deref().filter(|ns| !ns.is_empty());
                namespace_ok && (local == "*" || element.name.local == *local)
            }
            _ => false,
        }
    }
}
