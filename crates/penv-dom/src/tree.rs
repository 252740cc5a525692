//! DOM Tree (arena-based allocation)
//!
//! Node factory, read accessors and node lifetime. Tree mutation lives in
//! `mutation.rs`, attributes in `attributes.rs`.

use crate::names::{validate_name, validate_qualified_name, split_qualified_name};
use crate::node::{AttrData, DocumentData, DocumentKind, ElementData, Node, NodeData, NodeType};
use crate::{DomError, DomResult, NodeId, NodeList, QualName, XHTML_NAMESPACE, XMLNS_NAMESPACE};

/// `DOMImplementation`: tree-wide behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomImplementation {
    /// Run hierarchy, document, read-only and name checks.
    /// Parsers building trusted trees may switch this off.
    pub error_checking: bool,
}

impl Default for DomImplementation {
    fn default() -> Self {
        Self {
            error_checking: true,
        }
    }
}

impl DomImplementation {
    /// `hasFeature(feature, version)`
    pub fn has_feature(&self, feature: &str, version: Option<&str>) -> bool {
        let version_ok = matches!(version, None | Some("") | Some("1.0") | Some("2.0"));
        version_ok
            && matches!(
                feature.to_ascii_lowercase().as_str(),
                "core"
                    | "xml"
                    | "html"
                    | "events"
                    | "htmlevents"
                    | "uievents"
                    | "mouseevents"
                    | "mutationevents"
            )
    }
}

/// Arena-based DOM tree holding the nodes of every document
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: Vec<Option<Node>>,
    live: usize,
    implementation: DomImplementation,
}

/// Iterator over the parent chain of a node (nearest first)
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent_node(current);
        Some(current)
    }
}

pub(crate) fn not_found(id: NodeId) -> DomError {
    DomError::NotFound(format!("node {} does not exist", id))
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_implementation(implementation: DomImplementation) -> Self {
        Self {
            implementation,
            ..Default::default()
        }
    }

    pub fn implementation(&self) -> DomImplementation {
        self.implementation
    }

    pub fn error_checking(&self) -> bool {
        self.implementation.error_checking
    }

    pub fn set_error_checking(&mut self, enabled: bool) {
        self.implementation.error_checking = enabled;
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or_else(|| not_found(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or_else(|| not_found(id))
    }

    /// True while `id` refers to a node that has not been discarded
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        self.live += 1;
        id
    }

    /// The document a node belongs to (a document belongs to itself)
    pub(crate) fn document_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        match node.data {
            NodeData::Document(_) => Some(id),
            _ => node.owner_document,
        }
    }

    pub(crate) fn is_html(&self, id: NodeId) -> bool {
        self.document_of(id)
            .and_then(|doc| self.get(doc))
            .and_then(Node::as_document)
            .is_some_and(|data| data.kind == DocumentKind::Html)
    }

    fn document_kind_of(&self, doc: NodeId) -> DomResult<DocumentKind> {
        Ok(self.document_data(doc)?.kind)
    }

    // ------------------------------------------------------------------
    // Factory
    // ------------------------------------------------------------------

    /// Create a new, empty document
    pub fn create_document(&mut self, kind: DocumentKind, url: &str) -> NodeId {
        let id = self.alloc(Node::new(NodeData::Document(DocumentData::new(kind, url)), None));
        tracing::debug!("Created {:?} document {} for {}", kind, id, url);
        id
    }

    /// `Document.createElement`
    pub fn create_element(&mut self, doc: NodeId, tag: &str) -> DomResult<NodeId> {
        let kind = self.document_kind_of(doc)?;
        if self.error_checking() {
            validate_name(tag)?;
        }
        let name = match kind {
            DocumentKind::Html => {
                QualName::new(Some(XHTML_NAMESPACE.to_string()), None, tag.to_ascii_lowercase())
            }
            DocumentKind::Xml => QualName::local(tag),
        };
        Ok(self.alloc(Node::new(NodeData::Element(ElementData::new(name)), Some(doc))))
    }

    /// `Document.createElementNS`
    pub fn create_element_ns(
        &mut self,
        doc: NodeId,
        namespace: Option<&str>,
        qualified_name: &str,
    ) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        let name = self.qualify(namespace, qualified_name, false)?;
        Ok(self.alloc(Node::new(NodeData::Element(ElementData::new(name)), Some(doc))))
    }

    pub(crate) fn qualify(
        &self,
        namespace: Option<&str>,
        qualified_name: &str,
        is_attribute: bool,
    ) -> DomResult<QualName> {
        if self.error_checking() {
            return validate_qualified_name(namespace, qualified_name, is_attribute);
        }
        let (prefix, local) = split_qualified_name(qualified_name)
            .unwrap_or((None, qualified_name));
        Ok(QualName::new(
            namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            prefix.map(str::to_string),
            local,
        ))
    }

    /// `Document.createTextNode`
    pub fn create_text_node(&mut self, doc: NodeId, data: &str) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        Ok(self.alloc(Node::new(NodeData::Text(data.to_string()), Some(doc))))
    }

    /// `Document.createComment`
    pub fn create_comment(&mut self, doc: NodeId, data: &str) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        Ok(self.alloc(Node::new(NodeData::Comment(data.to_string()), Some(doc))))
    }

    /// `Document.createCDATASection` (XML documents only)
    pub fn create_cdata_section(&mut self, doc: NodeId, data: &str) -> DomResult<NodeId> {
        if self.document_kind_of(doc)? == DocumentKind::Html {
            return Err(DomError::NotSupported(
                "HTML documents do not support CDATA sections".into(),
            ));
        }
        Ok(self.alloc(Node::new(NodeData::CData(data.to_string()), Some(doc))))
    }

    /// `Document.createProcessingInstruction` (XML documents only)
    pub fn create_processing_instruction(
        &mut self,
        doc: NodeId,
        target: &str,
        data: &str,
    ) -> DomResult<NodeId> {
        if self.document_kind_of(doc)? == DocumentKind::Html {
            return Err(DomError::NotSupported(
                "HTML documents do not support processing instructions".into(),
            ));
        }
        if self.error_checking() {
            validate_name(target)?;
        }
        Ok(self.alloc(Node::new(
            NodeData::ProcessingInstruction {
                target: target.to_string(),
                data: data.to_string(),
            },
            Some(doc),
        )))
    }

    /// `Document.createDocumentFragment`
    pub fn create_document_fragment(&mut self, doc: NodeId) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        Ok(self.alloc(Node::new(NodeData::DocumentFragment, Some(doc))))
    }

    /// `Document.createAttribute`
    pub fn create_attribute(&mut self, doc: NodeId, name: &str) -> DomResult<NodeId> {
        let kind = self.document_kind_of(doc)?;
        if self.error_checking() {
            validate_name(name)?;
        }
        let local = match kind {
            DocumentKind::Html => name.to_ascii_lowercase(),
            DocumentKind::Xml => name.to_string(),
        };
        Ok(self.alloc_attr(doc, AttrData::new(QualName::local(local), "")))
    }

    /// `Document.createAttributeNS`
    pub fn create_attribute_ns(
        &mut self,
        doc: NodeId,
        namespace: Option<&str>,
        qualified_name: &str,
    ) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        let name = self.qualify(namespace, qualified_name, true)?;
        Ok(self.alloc_attr(doc, AttrData::new(name, "")))
    }

    pub(crate) fn alloc_attr(&mut self, doc: NodeId, attr: AttrData) -> NodeId {
        self.alloc(Node::new(NodeData::Attribute(attr), Some(doc)))
    }

    /// `Document.createEntityReference` (XML documents only)
    pub fn create_entity_reference(&mut self, doc: NodeId, name: &str) -> DomResult<NodeId> {
        if self.document_kind_of(doc)? == DocumentKind::Html {
            return Err(DomError::NotSupported(
                "HTML documents do not support entity references".into(),
            ));
        }
        if self.error_checking() {
            validate_name(name)?;
        }
        Ok(self.alloc(Node::new(
            NodeData::EntityReference {
                name: name.to_string(),
            },
            Some(doc),
        )))
    }

    /// `DOMImplementation.createDocumentType`, owned by `doc`
    pub fn create_document_type(
        &mut self,
        doc: NodeId,
        name: &str,
        public_id: &str,
        system_id: &str,
    ) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        if self.error_checking() {
            validate_name(name)?;
        }
        Ok(self.alloc(Node::new(
            NodeData::DocumentType {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            Some(doc),
        )))
    }

    /// Entity declaration, for parsers populating a doctype
    pub fn create_entity(
        &mut self,
        doc: NodeId,
        name: &str,
        public_id: &str,
        system_id: &str,
        notation_name: &str,
    ) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        Ok(self.alloc(Node::new(
            NodeData::Entity {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
                notation_name: notation_name.to_string(),
            },
            Some(doc),
        )))
    }

    /// Notation declaration, for parsers populating a doctype
    pub fn create_notation(
        &mut self,
        doc: NodeId,
        name: &str,
        public_id: &str,
        system_id: &str,
    ) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        Ok(self.alloc(Node::new(
            NodeData::Notation {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            Some(doc),
        )))
    }

    /// Namespace declaration node
    pub fn create_namespace(
        &mut self,
        doc: NodeId,
        prefix: Option<&str>,
        uri: &str,
    ) -> DomResult<NodeId> {
        self.document_kind_of(doc)?;
        Ok(self.alloc(Node::new(
            NodeData::Namespace {
                prefix: prefix.map(str::to_string),
                uri: uri.to_string(),
            },
            Some(doc),
        )))
    }

    pub(crate) fn alloc_copy(&mut self, data: NodeData, doc: NodeId) -> NodeId {
        self.alloc(Node::new(data, Some(doc)))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn node_type(&self, id: NodeId) -> DomResult<NodeType> {
        Ok(self.node(id)?.node_type())
    }

    /// `nodeName`
    pub fn node_name(&self, id: NodeId) -> DomResult<String> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Element(e) => {
                let name = e.name.qualified();
                if e.name.namespace() == Some(XHTML_NAMESPACE) && self.is_html(id) {
                    name.to_ascii_uppercase()
                } else {
                    name
                }
            }
            NodeData::Attribute(a) => a.name.qualified(),
            NodeData::Text(_) => "#text".into(),
            NodeData::CData(_) => "#cdata-section".into(),
            NodeData::Comment(_) => "#comment".into(),
            NodeData::Document(_) => "#document".into(),
            NodeData::DocumentFragment => "#document-fragment".into(),
            NodeData::DocumentType { name, .. }
            | NodeData::EntityReference { name }
            | NodeData::Entity { name, .. }
            | NodeData::Notation { name, .. } => name.clone(),
            NodeData::ProcessingInstruction { target, .. } => target.clone(),
            NodeData::Namespace { prefix, .. } => match prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".into(),
            },
        })
    }

    /// `Element.tagName`
    pub fn tag_name(&self, id: NodeId) -> DomResult<String> {
        if !self.node(id)?.is_element() {
            return Err(DomError::NotSupported(format!("node {} is not an element", id)));
        }
        self.node_name(id)
    }

    /// `nodeValue`
    pub fn node_value(&self, id: NodeId) -> DomResult<Option<String>> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Attribute(a) => Some(a.value.clone()),
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => Some(s.clone()),
            NodeData::ProcessingInstruction { data, .. } => Some(data.clone()),
            NodeData::Namespace { uri, .. } => Some(uri.clone()),
            _ => None,
        })
    }

    /// Set `nodeValue`; a no-op for nodes whose value is defined as null
    pub fn set_node_value(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        self.check_writable(id)?;
        let node = self.node_mut(id)?;
        match &mut node.data {
            NodeData::Attribute(a) => {
                a.value = value.to_string();
                a.specified = true;
            }
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => {
                *s = value.to_string();
            }
            NodeData::ProcessingInstruction { data, .. } => *data = value.to_string(),
            _ => {}
        }
        Ok(())
    }

    /// `namespaceURI`
    pub fn namespace_uri(&self, id: NodeId) -> DomResult<Option<String>> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Element(e) => e.name.namespace.clone(),
            NodeData::Attribute(a) => a.name.namespace.clone(),
            NodeData::Namespace { .. } => Some(XMLNS_NAMESPACE.to_string()),
            _ => None,
        })
    }

    /// `prefix`
    pub fn prefix(&self, id: NodeId) -> DomResult<Option<String>> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Element(e) => e.name.prefix.clone(),
            NodeData::Attribute(a) => a.name.prefix.clone(),
            _ => None,
        })
    }

    /// `localName` (null for nodes that are neither elements nor attributes)
    pub fn local_name(&self, id: NodeId) -> DomResult<Option<String>> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Element(e) => Some(e.name.local.clone()),
            NodeData::Attribute(a) => Some(a.name.local.clone()),
            _ => None,
        })
    }

    pub fn owner_document(&self, id: NodeId) -> DomResult<Option<NodeId>> {
        Ok(self.node(id)?.owner_document)
    }

    pub fn parent_node(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Child handles in order (empty for unknown ids)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// `childNodes` as a live list
    pub fn child_nodes(&self, id: NodeId) -> NodeList {
        NodeList::Children(id)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of `id` among its siblings. Checks the cached hint first, so a
    /// sibling walk is O(1) per step; a stale hint costs one scan.
    pub(crate) fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let node = self.get(id)?;
        let parent = node.parent?;
        let children = self.children(parent);
        let hint = node.index_hint.get();
        if children.get(hint) == Some(&id) {
            return Some((parent, hint));
        }
        let index = children.iter().position(|&c| c == id)?;
        node.index_hint.set(index);
        Some((parent, index))
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn has_child_nodes(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Parent chain, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent_node(id),
        }
    }

    /// All descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// True if `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn is_same_node(&self, a: NodeId, b: NodeId) -> bool {
        a == b && self.contains_node(a)
    }

    /// `isEqualNode`: structural equality of two subtrees
    pub fn is_equal_node(&self, a: NodeId, b: NodeId) -> bool {
        let (Some(left), Some(right)) = (self.get(a), self.get(b)) else {
            return false;
        };
        if left.node_type() != right.node_type() {
            return false;
        }
        let same_data = match (&left.data, &right.data) {
            (NodeData::Element(l), NodeData::Element(r)) => {
                l.name == r.name
                    && l.attributes.len() == r.attributes.len()
                    && l.attributes.iter().all(|&la| {
                        let Some(la) = self.get(la).and_then(Node::as_attr) else {
                            return false;
                        };
                        r.attributes.iter().any(|&ra| {
                            self.get(ra)
                                .and_then(Node::as_attr)
                                .is_some_and(|ra| ra.name == la.name && ra.value == la.value)
                        })
                    })
            }
            (NodeData::Attribute(l), NodeData::Attribute(r)) => {
                l.name == r.name && l.value == r.value
            }
            _ => {
                self.node_name(a).ok() == self.node_name(b).ok()
                    && self.node_value(a).ok() == self.node_value(b).ok()
            }
        };
        same_data
            && left.children.len() == right.children.len()
            && left
                .children
                .iter()
                .zip(&right.children)
                .all(|(&l, &r)| self.is_equal_node(l, r))
    }

    /// `textContent`
    pub fn text_content(&self, id: NodeId) -> DomResult<Option<String>> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Document(_) | NodeData::DocumentType { .. } | NodeData::Notation { .. } => {
                None
            }
            NodeData::Element(_)
            | NodeData::DocumentFragment
            | NodeData::Entity { .. }
            | NodeData::EntityReference { .. } => {
                let mut text = String::new();
                for d in self.descendants(id) {
                    if let Some(NodeData::Text(s) | NodeData::CData(s)) = self.get(d).map(|n| &n.data) {
                        text.push_str(s);
                    }
                }
                Some(text)
            }
            _ => self.node_value(id)?,
        })
    }

    /// Set `textContent`: replaces all children with at most one text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        self.check_writable(id)?;
        match self.node(id)?.node_type() {
            NodeType::Element | NodeType::DocumentFragment | NodeType::EntityReference => {
                for child in self.children(id).to_vec() {
                    self.remove_child(id, child)?;
                }
                if !text.is_empty() {
                    let doc = self
                        .document_of(id)
                        .ok_or_else(|| DomError::WrongDocument(format!("node {} has no document", id)))?;
                    let text_node = self.create_text_node(doc, text)?;
                    self.append_child(id, text_node)?;
                }
                Ok(())
            }
            NodeType::Document | NodeType::DocumentType | NodeType::Notation => Ok(()),
            _ => self.set_node_value(id, text),
        }
    }

    /// Read-only check, active only with error checking
    pub(crate) fn check_writable(&self, id: NodeId) -> DomResult<()> {
        if !self.error_checking() {
            return Ok(());
        }
        let readonly = self.node(id)?.read_only
            || self.ancestors(id).any(|a| self.get(a).is_some_and(|n| n.read_only));
        if readonly {
            Err(DomError::NoModificationAllowed(format!("node {} is read-only", id)))
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Lifetime
    // ------------------------------------------------------------------

    /// Free a detached subtree (including its attributes) from the arena.
    ///
    /// Returns every freed handle so side tables keyed by node can be purged.
    pub fn discard(&mut self, id: NodeId) -> DomResult<Vec<NodeId>> {
        let node = self.node(id)?;
        let attached = node.parent.is_some()
            || node.as_attr().is_some_and(|a| a.owner_element.is_some());
        if attached {
            return Err(DomError::InvalidState(format!(
                "node {} is still attached and cannot be discarded",
                id
            )));
        }
        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current.0 as usize).and_then(Option::take) else {
                continue;
            };
            self.live -= 1;
            freed.push(current);
            stack.extend(node.children.iter().copied());
            if let NodeData::Element(e) = &node.data {
                stack.extend(e.attributes.iter().copied());
            }
        }
        tracing::debug!("Discarded {} nodes rooted at {}", freed.len(), id);
        Ok(freed)
    }
}
