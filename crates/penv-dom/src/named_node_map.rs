//! NamedNodeMap
//!
//! Live, order-preserving view over one element's attributes, with lookup by
//! qualified name or by (namespace, local name).

use crate::{DomError, DomResult, DomTree, NodeId};

/// `NamedNodeMap` bound to its owner element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedNodeMap {
    owner: NodeId,
}

impl NamedNodeMap {
    pub fn new(owner: NodeId) -> Self {
        Self { owner }
    }

    /// The element whose attributes this map exposes
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    fn slice<'a>(&self, tree: &'a DomTree) -> &'a [NodeId] {
        tree.get(self.owner)
            .and_then(|n| n.as_element())
            .map(|e| e.attributes())
            .unwrap_or(&[])
    }

    pub fn length(&self, tree: &DomTree) -> usize {
        self.slice(tree).len()
    }

    pub fn item(&self, tree: &DomTree, index: usize) -> Option<NodeId> {
        self.slice(tree).get(index).copied()
    }

    pub fn iter<'a>(&self, tree: &'a DomTree) -> impl Iterator<Item = NodeId> + 'a {
        self.slice(tree).iter().copied()
    }

    pub fn get_named_item(&self, tree: &DomTree, name: &str) -> Option<NodeId> {
        tree.get_attribute_node(self.owner, name)
    }

    pub fn get_named_item_ns(
        &self,
        tree: &DomTree,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeId> {
        tree.get_attribute_node_ns(self.owner, namespace, local_name)
    }

    /// `setNamedItem`: returns the replaced Attr, if any
    pub fn set_named_item(&self, tree: &mut DomTree, attr: NodeId) -> DomResult<Option<NodeId>> {
        tree.set_attribute_node(self.owner, attr)
    }

    pub fn set_named_item_ns(&self, tree: &mut DomTree, attr: NodeId) -> DomResult<Option<NodeId>> {
        tree.set_attribute_node_ns(self.owner, attr)
    }

    /// `removeNamedItem`: fails with `NotFound` when absent
    pub fn remove_named_item(&self, tree: &mut DomTree, name: &str) -> DomResult<NodeId> {
        let attr = self
            .get_named_item(tree, name)
            .ok_or_else(|| DomError::NotFound(format!("no attribute named '{}'", name)))?;
        tree.remove_attribute_node(self.owner, attr)
    }

    pub fn remove_named_item_ns(
        &self,
        tree: &mut DomTree,
        namespace: Option<&str>,
        local_name: &str,
    ) -> DomResult<NodeId> {
        let attr = self
            .get_named_item_ns(tree, namespace, local_name)
            .ok_or_else(|| {
                DomError::NotFound(format!(
                    "no attribute {{{}}}{}",
                    namespace.unwrap_or_default(),
                    local_name
                ))
            })?;
        tree.remove_attribute_node(self.owner, attr)
    }
}
