//! Tree Mutation
//!
//! `appendChild`, `insertBefore`, `replaceChild` and `removeChild` over the
//! arena. Every operation validates first and mutates second, so a failed
//! call leaves the tree untouched.

use crate::tree::not_found;
use crate::{DomError, DomResult, DomTree, NodeId, NodeType};

/// Which node types may appear as children of which (DOM structure model)
fn allows_child(parent: NodeType, child: NodeType) -> bool {
    use NodeType::*;
    match parent {
        Element | DocumentFragment | EntityReference | Entity => matches!(
            child,
            Element | Text | Comment | ProcessingInstruction | CDataSection | EntityReference
        ),
        Attribute => matches!(child, Text | EntityReference),
        Document => matches!(
            child,
            Element | ProcessingInstruction | Comment | DocumentType
        ),
        _ => false,
    }
}

impl DomTree {
    /// `appendChild`: returns the appended node
    pub fn append_child(&mut self, parent: NodeId, new_child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, new_child, None)
    }

    /// `insertBefore`: `ref_child == None` appends
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insert(parent, new_child, ref_child)?;
        if ref_child == Some(new_child) {
            return Ok(new_child);
        }

        let moved = self.take_for_insertion(new_child)?;
        let index = match ref_child {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|&c| c == reference)
                .ok_or_else(|| not_found(reference))?,
            None => self.children(parent).len(),
        };
        self.splice_in(parent, index, &moved)?;
        Ok(new_child)
    }

    /// `replaceChild`: returns the replaced node
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        self.check_replace(parent, new_child, old_child)?;
        if new_child == old_child {
            return Ok(old_child);
        }

        let moved = self.take_for_insertion(new_child)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == old_child)
            .ok_or_else(|| not_found(old_child))?;
        self.unlink(parent, old_child)?;
        self.splice_in(parent, index, &moved)?;
        Ok(old_child)
    }

    /// `removeChild`: returns the removed node
    pub fn remove_child(&mut self, parent: NodeId, old_child: NodeId) -> DomResult<NodeId> {
        self.check_remove(parent, old_child)?;
        self.unlink(parent, old_child)?;
        Ok(old_child)
    }

    /// The checks [`insert_before`](Self::insert_before) runs, without mutating
    pub fn check_insert(
        &self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<()> {
        self.node(parent)?;
        self.node(new_child)?;
        if let Some(reference) = ref_child {
            self.check_is_child(parent, reference)?;
            if reference == new_child {
                return Ok(());
            }
        }
        self.validate_insertion(parent, new_child, None)
    }

    /// The checks [`replace_child`](Self::replace_child) runs, without mutating
    pub fn check_replace(
        &self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<()> {
        self.node(parent)?;
        self.node(new_child)?;
        self.check_is_child(parent, old_child)?;
        if new_child == old_child {
            return Ok(());
        }
        self.validate_insertion(parent, new_child, Some(old_child))
    }

    /// The checks [`remove_child`](Self::remove_child) runs, without mutating
    pub fn check_remove(&self, parent: NodeId, old_child: NodeId) -> DomResult<()> {
        self.node(parent)?;
        self.check_is_child(parent, old_child)?;
        self.check_writable(parent)
    }

    /// Detach a node from wherever it currently is (no-op when detached)
    pub fn detach(&mut self, node: NodeId) -> DomResult<()> {
        match self.parent_node(node) {
            Some(parent) => self.remove_child(parent, node).map(|_| ()),
            None => Ok(()),
        }
    }

    fn check_is_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.get(child).and_then(|n| n.parent) == Some(parent) {
            Ok(())
        } else {
            Err(DomError::NotFound(format!(
                "node {} is not a child of {}",
                child, parent
            )))
        }
    }

    /// All pre-mutation checks. `replacing` is excluded from the
    /// single-element / single-doctype count.
    fn validate_insertion(
        &self,
        parent: NodeId,
        new_child: NodeId,
        replacing: Option<NodeId>,
    ) -> DomResult<()> {
        // Cycles would corrupt the arena, so they are refused even in lenient mode.
        if self.contains(new_child, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "node {} is an ancestor of (or the same as) {}",
                new_child, parent
            )));
        }
        if !self.error_checking() {
            return Ok(());
        }

        self.check_writable(parent)?;
        if let Some(old_parent) = self.parent_node(new_child) {
            self.check_writable(old_parent)?;
        }

        if self.document_of(new_child) != self.document_of(parent) {
            return Err(DomError::WrongDocument(format!(
                "node {} was created by a different document than {}",
                new_child, parent
            )));
        }

        let parent_type = self.node_type(parent)?;
        let incoming: Vec<NodeId> = if self.node_type(new_child)? == NodeType::DocumentFragment {
            self.children(new_child).to_vec()
        } else {
            vec![new_child]
        };
        for &child in &incoming {
            let child_type = self.node_type(child)?;
            if !allows_child(parent_type, child_type) {
                return Err(DomError::HierarchyRequest(format!(
                    "{:?} nodes cannot contain {:?} nodes",
                    parent_type, child_type
                )));
            }
        }

        if parent_type == NodeType::Document {
            for kind in [NodeType::Element, NodeType::DocumentType] {
                let adding = incoming
                    .iter()
                    .filter(|&&c| self.get(c).is_some_and(|n| n.node_type() == kind))
                    .count();
                if adding == 0 {
                    continue;
                }
                let existing = self
                    .children(parent)
                    .iter()
                    .filter(|&&c| Some(c) != replacing && c != new_child)
                    .filter(|&&c| self.get(c).is_some_and(|n| n.node_type() == kind))
                    .count();
                if existing + adding > 1 {
                    return Err(DomError::HierarchyRequest(format!(
                        "a document may hold only one {:?} child",
                        kind
                    )));
                }
            }
        }
        Ok(())
    }

    /// Detach `new_child` (or empty it, for a fragment) and return the nodes
    /// to splice in.
    fn take_for_insertion(&mut self, new_child: NodeId) -> DomResult<Vec<NodeId>> {
        if self.node_type(new_child)? == NodeType::DocumentFragment {
            let moved = std::mem::take(&mut self.node_mut(new_child)?.children);
            for &child in &moved {
                self.node_mut(child)?.parent = None;
            }
            return Ok(moved);
        }
        if let Some(old_parent) = self.parent_node(new_child) {
            self.unlink(old_parent, new_child)?;
        }
        Ok(vec![new_child])
    }

    fn splice_in(&mut self, parent: NodeId, index: usize, nodes: &[NodeId]) -> DomResult<()> {
        for &node in nodes {
            self.node_mut(node)?.parent = Some(parent);
        }
        let children = &mut self.node_mut(parent)?.children;
        let index = index.min(children.len());
        children.splice(index..index, nodes.iter().copied());
        for (offset, &node) in nodes.iter().enumerate() {
            self.node(node)?.index_hint.set(index + offset);
        }

        if let Some(doc) = self.connected_document(parent) {
            for &node in nodes {
                self.index_subtree(doc, node);
            }
        }
        tracing::debug!("Inserted {} node(s) into {} at {}", nodes.len(), parent, index);
        Ok(())
    }

    pub(crate) fn unlink(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if let Some(doc) = self.connected_document(parent) {
            self.evict_subtree(doc, child);
        }
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;
        Ok(())
    }
}
