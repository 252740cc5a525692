//! Cloning, Importing and Normalization

use crate::node::{ElementData, NodeData};
use crate::{DomError, DomResult, DomTree, NodeId, NodeType};

impl DomTree {
    /// `Document.importNode`: copy `node` into `doc`. The copy is detached
    /// and owned by `doc`; the source is left untouched.
    pub fn import_node(&mut self, doc: NodeId, node: NodeId, deep: bool) -> DomResult<NodeId> {
        self.document_data(doc)?;
        match self.node_type(node)? {
            NodeType::Document | NodeType::DocumentType => Err(DomError::NotSupported(format!(
                "node {} cannot be imported",
                node
            ))),
            _ => self.copy_subtree(doc, node, deep),
        }
    }

    /// `cloneNode`: import into the node's own document
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let doc = self
            .document_of(node)
            .ok_or_else(|| DomError::NotSupported(format!("node {} has no document", node)))?;
        if doc == node {
            return Err(DomError::NotSupported("documents cannot be cloned".into()));
        }
        if self.node_type(node)? == NodeType::DocumentType {
            let NodeData::DocumentType {
                name,
                public_id,
                system_id,
            } = self.node(node)?.data.clone()
            else {
                return Err(DomError::NotSupported(format!("node {} is not a doctype", node)));
            };
            return self.create_document_type(doc, &name, &public_id, &system_id);
        }
        self.copy_subtree(doc, node, deep)
    }

    fn copy_subtree(&mut self, doc: NodeId, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let source = self.node(node)?;
        let children = if deep { source.children.clone() } else { Vec::new() };
        let copy = match source.data.clone() {
            NodeData::Element(element) => {
                let attributes: Vec<_> = element
                    .attributes
                    .iter()
                    .filter_map(|&a| self.get(a).and_then(|n| n.as_attr()))
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect();
                let copy = self.alloc_copy(NodeData::Element(ElementData::new(element.name)), doc);
                for (name, value) in attributes {
                    self.set_qualified_attribute(copy, name, &value)?;
                }
                copy
            }
            NodeData::Attribute(mut attr) => {
                attr.owner_element = None;
                attr.specified = true;
                self.alloc_copy(NodeData::Attribute(attr), doc)
            }
            NodeData::Document(_) => {
                return Err(DomError::NotSupported(format!(
                    "node {} cannot be copied",
                    node
                )));
            }
            other => self.alloc_copy(other, doc),
        };

        for child in children {
            let child_copy = self.copy_subtree(doc, child, true)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// `normalize`: merge adjacent text nodes and drop empty ones, recursively
    pub fn normalize(&mut self, node: NodeId) -> DomResult<()> {
        self.check_writable(node)?;
        let mut previous_text: Option<NodeId> = None;
        for child in self.children(node).to_vec() {
            let child_type = self.node_type(child)?;
            if child_type != NodeType::Text {
                previous_text = None;
                if child_type == NodeType::Element {
                    self.normalize(child)?;
                }
                continue;
            }
            let text = self.data(child)?.to_string();
            if text.is_empty() {
                self.unlink(node, child)?;
                continue;
            }
            match previous_text {
                Some(previous) => {
                    self.append_data(previous, &text)?;
                    self.unlink(node, child)?;
                }
                None => previous_text = Some(child),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{DocumentKind, DomError, DomTree};

    #[test]
    fn test_deep_clone_is_independent() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let div = tree.create_element(doc, "div").unwrap();
        tree.set_attribute(div, "class", "box").unwrap();
        let text = tree.create_text_node(doc, "hi").unwrap();
        tree.append_child(div, text).unwrap();

        let copy = tree.clone_node(div, true).unwrap();
        assert_ne!(copy, div);
        assert!(tree.is_equal_node(copy, div));
        assert_eq!(tree.parent_node(copy), None);

        let copied_text = tree.first_child(copy).unwrap();
        assert_ne!(copied_text, text);
        tree.set_data(copied_text, "changed").unwrap();
        assert_eq!(tree.data(text).unwrap(), "hi");
        tree.set_attribute(copy, "class", "other").unwrap();
        assert_eq!(tree.get_attribute(div, "class").as_deref(), Some("box"));
    }

    #[test]
    fn test_shallow_clone_keeps_attributes() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let div = tree.create_element(doc, "div").unwrap();
        tree.set_attribute(div, "title", "t").unwrap();
        let child = tree.create_element(doc, "span").unwrap();
        tree.append_child(div, child).unwrap();

        let copy = tree.clone_node(div, false).unwrap();
        assert!(!tree.has_child_nodes(copy));
        assert_eq!(tree.get_attribute(copy, "title").as_deref(), Some("t"));
    }

    #[test]
    fn test_import_node() {
        let mut tree = DomTree::new();
        let source = tree.create_document(DocumentKind::Xml, "about:blank");
        let target = tree.create_document(DocumentKind::Xml, "about:blank");
        let el = tree.create_element(source, "item").unwrap();
        let imported = tree.import_node(target, el, true).unwrap();
        assert_eq!(tree.owner_document(imported).unwrap(), Some(target));
        assert_eq!(tree.owner_document(el).unwrap(), Some(source));

        assert!(matches!(
            tree.import_node(target, source, true),
            Err(DomError::NotSupported(_))
        ));
        let doctype = tree.create_document_type(source, "x", "", "").unwrap();
        assert!(matches!(
            tree.import_node(target, doctype, false),
            Err(DomError::NotSupported(_))
        ));
    }

    #[test]
    fn test_normalize() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let p = tree.create_element(doc, "p").unwrap();
        let inner = tree.create_element(doc, "b").unwrap();
        for (parent, parts) in [(p, vec!["a", "", "b"]), (inner, vec!["c", "d"])] {
            for part in parts {
                let t = tree.create_text_node(doc, part).unwrap();
                tree.append_child(parent, t).unwrap();
            }
        }
        tree.append_child(p, inner).unwrap();
        let tail = tree.create_text_node(doc, "e").unwrap();
        tree.append_child(p, tail).unwrap();

        tree.normalize(p).unwrap();
        let children = tree.children(p).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(tree.data(children[0]).unwrap(), "ab");
        assert_eq!(tree.children(inner).len(), 1);
        assert_eq!(tree.text_content(inner).unwrap().as_deref(), Some("cd"));
    }
}
