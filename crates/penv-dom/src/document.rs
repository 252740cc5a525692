//! Document
//!
//! Document-level queries and state: root element, doctype, the `id` index,
//! tag-name collections, parsing flag and ready state.

use crate::node::{DocumentData, DocumentKind, NodeData, ReadyState};
use crate::{DomError, DomResult, DomTree, NodeId, NodeList, NodeType};

impl DomTree {
    /// Document data of `doc`; fails if `doc` is not a document
    pub fn document_data(&self, doc: NodeId) -> DomResult<&DocumentData> {
        self.node(doc)?
            .as_document()
            .ok_or_else(|| DomError::NotSupported(format!("node {} is not a document", doc)))
    }

    pub(crate) fn document_data_mut(&mut self, doc: NodeId) -> DomResult<&mut DocumentData> {
        self.node_mut(doc)?
            .as_document_mut()
            .ok_or_else(|| DomError::NotSupported(format!("node {} is not a document", doc)))
    }

    pub fn kind(&self, doc: NodeId) -> DomResult<DocumentKind> {
        Ok(self.document_data(doc)?.kind)
    }

    /// `document.URL`
    pub fn url(&self, doc: NodeId) -> DomResult<&str> {
        Ok(&self.document_data(doc)?.url)
    }

    pub fn set_url(&mut self, doc: NodeId, url: &str) -> DomResult<()> {
        self.document_data_mut(doc)?.url = url.to_string();
        Ok(())
    }

    /// True while a parser is building `doc`
    pub fn is_parsing(&self, doc: NodeId) -> bool {
        self.document_data(doc).is_ok_and(|d| d.parsing)
    }

    pub fn set_parsing(&mut self, doc: NodeId, parsing: bool) -> DomResult<()> {
        self.document_data_mut(doc)?.parsing = parsing;
        Ok(())
    }

    pub fn ready_state(&self, doc: NodeId) -> DomResult<ReadyState> {
        Ok(self.document_data(doc)?.ready_state)
    }

    pub fn set_ready_state(&mut self, doc: NodeId, state: ReadyState) -> DomResult<()> {
        self.document_data_mut(doc)?.ready_state = state;
        Ok(())
    }

    /// `documentElement`
    pub fn document_element(&self, doc: NodeId) -> Option<NodeId> {
        self.children(doc)
            .iter()
            .copied()
            .find(|&c| self.get(c).is_some_and(|n| n.is_element()))
    }

    /// `doctype`
    pub fn doctype(&self, doc: NodeId) -> Option<NodeId> {
        self.children(doc).iter().copied().find(|&c| {
            self.get(c)
                .is_some_and(|n| n.node_type() == NodeType::DocumentType)
        })
    }

    fn root_child_named(&self, doc: NodeId, local: &str) -> Option<NodeId> {
        let root = self.document_element(doc)?;
        self.children(root).iter().copied().find(|&c| {
            self.get(c)
                .and_then(|n| n.as_element())
                .is_some_and(|e| e.name.local.eq_ignore_ascii_case(local))
        })
    }

    /// `document.head`
    pub fn head(&self, doc: NodeId) -> Option<NodeId> {
        self.root_child_named(doc, "head")
    }

    /// `document.body`
    pub fn body(&self, doc: NodeId) -> Option<NodeId> {
        self.root_child_named(doc, "body")
    }

    /// The document whose tree `id` is currently connected to
    pub fn connected_document(&self, id: NodeId) -> Option<NodeId> {
        let root = self.ancestors(id).last().unwrap_or(id);
        self.get(root)
            .is_some_and(|n| matches!(n.data, NodeData::Document(_)))
            .then_some(root)
    }

    /// Value of the `id` attribute (matched case-insensitively, no namespace)
    pub fn element_id(&self, element: NodeId) -> Option<&str> {
        let data = self.get(element)?.as_element()?;
        data.attributes.iter().find_map(|&attr| {
            let attr = self.get(attr)?.as_attr()?;
            (attr.name.namespace.is_none() && attr.name.local.eq_ignore_ascii_case("id"))
                .then_some(attr.value.as_str())
        })
    }

    /// `getElementById`: index lookup validated against the live tree, with a
    /// tree-order scan as the fallback
    pub fn get_element_by_id(&self, doc: NodeId, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        let cached = self
            .document_data(doc)
            .ok()
            .and_then(|data| data.ids.get(id).copied());
        if let Some(element) = cached {
            if self.element_id(element) == Some(id) && self.connected_document(element) == Some(doc) {
                return Some(element);
            }
        }
        self.descendants(doc)
            .into_iter()
            .find(|&n| self.element_id(n) == Some(id))
    }

    /// `getElementsByTagName` (live)
    pub fn get_elements_by_tag_name(&self, root: NodeId, name: &str) -> NodeList {
        NodeList::TagName {
            root,
            name: name.to_string(),
        }
    }

    /// `getElementsByTagNameNS` (live); `"*"` matches any namespace or name
    pub fn get_elements_by_tag_name_ns(
        &self,
        root: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> NodeList {
        NodeList::TagNameNs {
            root,
            namespace: namespace.map(str::to_string),
            local: local_name.to_string(),
        }
    }

    pub(crate) fn index_element_id(&mut self, doc: NodeId, element: NodeId) {
        let Some(id) = self.element_id(element).map(str::to_string) else {
            return;
        };
        let stale = match self.document_data(doc).ok().and_then(|d| d.ids.get(&id)) {
            Some(&existing) => {
                existing != element
                    && (self.element_id(existing) != Some(id.as_str())
                        || self.connected_document(existing) != Some(doc))
            }
            None => true,
        };
        if stale {
            if let Ok(data) = self.document_data_mut(doc) {
                data.ids.insert(id, element);
            }
        }
    }

    pub(crate) fn evict_element_id(&mut self, doc: NodeId, element: NodeId, id: &str) {
        if let Ok(data) = self.document_data_mut(doc) {
            if data.ids.get(id) == Some(&element) {
                data.ids.remove(id);
            }
        }
    }

    /// Index every `id` in a subtree that just became connected to `doc`
    pub(crate) fn index_subtree(&mut self, doc: NodeId, root: NodeId) {
        let mut nodes = vec![root];
        nodes.extend(self.descendants(root));
        for node in nodes {
            self.index_element_id(doc, node);
        }
    }

    /// Drop index entries for a subtree about to leave `doc`
    pub(crate) fn evict_subtree(&mut self, doc: NodeId, root: NodeId) {
        let mut nodes = vec![root];
        nodes.extend(self.descendants(root));
        for node in nodes {
            if let Some(id) = self.element_id(node).map(str::to_string) {
                self.evict_element_id(doc, node, &id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DocumentKind, DomTree, ReadyState};

    #[test]
    fn test_document_element_and_doctype() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let doctype = tree.create_document_type(doc, "html", "", "").unwrap();
        let html = tree.create_element(doc, "html").unwrap();
        let body = tree.create_element(doc, "body").unwrap();
        tree.append_child(doc, doctype).unwrap();
        tree.append_child(doc, html).unwrap();
        tree.append_child(html, body).unwrap();
        assert_eq!(tree.document_element(doc), Some(html));
        assert_eq!(tree.doctype(doc), Some(doctype));
        assert_eq!(tree.body(doc), Some(body));
        assert_eq!(tree.head(doc), None);
    }

    #[test]
    fn test_get_element_by_id_follows_tree() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let html = tree.create_element(doc, "html").unwrap();
        tree.append_child(doc, html).unwrap();
        let div = tree.create_element(doc, "div").unwrap();
        tree.set_attribute(div, "id", "x").unwrap();

        // not connected yet
        assert_eq!(tree.get_element_by_id(doc, "x"), None);
        tree.append_child(html, div).unwrap();
        assert_eq!(tree.get_element_by_id(doc, "x"), Some(div));

        tree.set_attribute(div, "id", "y").unwrap();
        assert_eq!(tree.get_element_by_id(doc, "x"), None);
        assert_eq!(tree.get_element_by_id(doc, "y"), Some(div));

        tree.remove_child(html, div).unwrap();
        assert_eq!(tree.get_element_by_id(doc, "y"), None);
    }

    #[test]
    fn test_id_attribute_case_insensitive() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Xml, "about:blank");
        let root = tree.create_element(doc, "root").unwrap();
        tree.append_child(doc, root).unwrap();
        tree.set_attribute(root, "ID", "main").unwrap();
        assert_eq!(tree.get_element_by_id(doc, "main"), Some(root));
    }

    #[test]
    fn test_parsing_and_ready_state() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "http://example.com/");
        assert!(!tree.is_parsing(doc));
        tree.set_parsing(doc, true).unwrap();
        assert!(tree.is_parsing(doc));
        assert_eq!(tree.ready_state(doc).unwrap(), ReadyState::Loading);
        tree.set_ready_state(doc, ReadyState::Complete).unwrap();
        assert_eq!(tree.ready_state(doc).unwrap().as_str(), "complete");
        assert_eq!(tree.url(doc).unwrap(), "http://example.com/");
    }
}
