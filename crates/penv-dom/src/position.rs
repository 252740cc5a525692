//! Document Position
//!
//! `compareDocumentPosition` by walking both ancestor chains up to their
//! lowest common ancestor. Attributes are positioned by their owner element
//! and precede that element's children.

use std::ops::BitOr;

use crate::{DomTree, NodeId};

/// `compareDocumentPosition` bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DocumentPosition(u16);

impl DocumentPosition {
    pub const DISCONNECTED: Self = Self(0x01);
    pub const PRECEDING: Self = Self(0x02);
    pub const FOLLOWING: Self = Self(0x04);
    pub const CONTAINS: Self = Self(0x08);
    pub const CONTAINED_BY: Self = Self(0x10);
    pub const IMPLEMENTATION_SPECIFIC: Self = Self(0x20);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DocumentPosition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl DomTree {
    /// Parent for positioning purposes: Attr nodes hang off their element
    fn position_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        node.parent.or_else(|| node.as_attr().and_then(|a| a.owner_element))
    }

    /// `[id, parent, ..., root]`
    fn position_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.position_parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Position of `other` relative to `node`
    pub fn compare_document_position(&self, node: NodeId, other: NodeId) -> DocumentPosition {
        if node == other {
            return DocumentPosition::empty();
        }
        let ours = self.position_chain(node);
        let theirs = self.position_chain(other);

        if ours.last() != theirs.last() {
            // Consistent but arbitrary ordering between disconnected trees
            let order = if other < node {
                DocumentPosition::PRECEDING
            } else {
                DocumentPosition::FOLLOWING
            };
            return DocumentPosition::DISCONNECTED | DocumentPosition::IMPLEMENTATION_SPECIFIC | order;
        }
        if ours.contains(&other) {
            return DocumentPosition::CONTAINS | DocumentPosition::PRECEDING;
        }
        if theirs.contains(&node) {
            return DocumentPosition::CONTAINED_BY | DocumentPosition::FOLLOWING;
        }

        // Diverging children of the lowest common ancestor
        let (mut a, mut b) = (ours.iter().rev(), theirs.iter().rev());
        let mut common = None;
        let (ours_branch, theirs_branch) = loop {
            match (a.next(), b.next()) {
                (Some(x), Some(y)) if x == y => common = Some(*x),
                (Some(x), Some(y)) => break (*x, *y),
                _ => return DocumentPosition::empty(),
            }
        };
        let Some(common) = common else {
            return DocumentPosition::DISCONNECTED | DocumentPosition::IMPLEMENTATION_SPECIFIC;
        };

        let is_attr = |id: NodeId| self.get(id).is_some_and(|n| n.as_attr().is_some());
        let other_first = match (is_attr(ours_branch), is_attr(theirs_branch)) {
            (true, false) => false,
            (false, true) => true,
            (true, true) => {
                let attrs = self
                    .get(common)
                    .and_then(|n| n.as_element())
                    .map(|e| e.attributes())
                    .unwrap_or(&[]);
                let index = |id| attrs.iter().position(|&a| a == id);
                let order = if index(theirs_branch) < index(ours_branch) {
                    DocumentPosition::PRECEDING
                } else {
                    DocumentPosition::FOLLOWING
                };
                return DocumentPosition::IMPLEMENTATION_SPECIFIC | order;
            }
            (false, false) => {
                let children = self.children(common);
                let index = |id| children.iter().position(|&c| c == id);
                index(theirs_branch) < index(ours_branch)
            }
        };
        if other_first {
            DocumentPosition::PRECEDING
        } else {
            DocumentPosition::FOLLOWING
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentKind;

    #[test]
    fn test_siblings_and_containment() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let root = tree.create_element(doc, "div").unwrap();
        let a = tree.create_element(doc, "p").unwrap();
        let b = tree.create_element(doc, "p").unwrap();
        let deep = tree.create_element(doc, "span").unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(b, deep).unwrap();

        assert_eq!(tree.compare_document_position(a, b), DocumentPosition::FOLLOWING);
        assert_eq!(tree.compare_document_position(b, a), DocumentPosition::PRECEDING);
        assert_eq!(tree.compare_document_position(a, deep), DocumentPosition::FOLLOWING);
        assert_eq!(
            tree.compare_document_position(deep, root),
            DocumentPosition::CONTAINS | DocumentPosition::PRECEDING
        );
        assert_eq!(
            tree.compare_document_position(root, deep),
            DocumentPosition::CONTAINED_BY | DocumentPosition::FOLLOWING
        );
        assert!(tree.compare_document_position(a, a).is_empty());
    }

    #[test]
    fn test_disconnected() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let a = tree.create_element(doc, "p").unwrap();
        let b = tree.create_element(doc, "p").unwrap();
        let forward = tree.compare_document_position(a, b);
        let backward = tree.compare_document_position(b, a);
        assert!(forward.contains(DocumentPosition::DISCONNECTED));
        assert!(forward.contains(DocumentPosition::IMPLEMENTATION_SPECIFIC));
        // the arbitrary order is still antisymmetric
        assert_ne!(
            forward.contains(DocumentPosition::FOLLOWING),
            backward.contains(DocumentPosition::FOLLOWING)
        );
    }

    #[test]
    fn test_attributes_precede_children() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let div = tree.create_element(doc, "div").unwrap();
        let child = tree.create_element(doc, "span").unwrap();
        tree.append_child(div, child).unwrap();
        tree.set_attribute(div, "title", "x").unwrap();
        let attr = tree.get_attribute_node(div, "title").unwrap();

        assert_eq!(tree.compare_document_position(attr, child), DocumentPosition::FOLLOWING);
        assert_eq!(
            tree.compare_document_position(attr, div),
            DocumentPosition::CONTAINS | DocumentPosition::PRECEDING
        );
    }
}
