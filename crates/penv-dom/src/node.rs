//! DOM Node
//!
//! One arena slot: tree links plus node-specific data.
//! - `parent` is a back-reference handle, never an owner
//! - `children` is the owning ordered child list; sibling links are derived
//!   from it, so list order and sibling order cannot disagree

use std::cell::Cell;
use std::collections::HashMap;

use crate::{NodeId, QualName};

/// Constants `NodeType` of the `Node` interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CDataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
    Namespace = 13,
}

impl NodeType {
    /// Numeric `nodeType`
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Text-like nodes carrying character data
    pub fn is_character_data(self) -> bool {
        matches!(
            self,
            NodeType::Text | NodeType::CDataSection | NodeType::Comment
        )
    }
}

/// Which flavour of document a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    /// HTML document: case-insensitive names, upper-case `tagName`
    #[default]
    Html,
    /// Generic XML document
    Xml,
}

/// `document.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Loading => "loading",
            ReadyState::Interactive => "interactive",
            ReadyState::Complete => "complete",
        }
    }
}

/// Document-specific data
#[derive(Debug, Clone, Default)]
pub struct DocumentData {
    /// HTML or XML
    pub kind: DocumentKind,
    /// Document URL
    pub url: String,
    /// True while a parser is constructing this document
    pub parsing: bool,
    /// Loading state
    pub ready_state: ReadyState,
    /// Cached `id` -> element lookups, validated on read
    pub(crate) ids: HashMap<String, NodeId>,
}

impl DocumentData {
    pub fn new(kind: DocumentKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name (qualified)
    pub name: QualName,
    /// Attr nodes, in insertion order
    pub(crate) attributes: Vec<NodeId>,
}

impl ElementData {
    pub fn new(name: QualName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    /// Attr node handles in insertion order
    pub fn attributes(&self) -> &[NodeId] {
        &self.attributes
    }
}

/// Attribute-specific data
#[derive(Debug, Clone)]
pub struct AttrData {
    pub name: QualName,
    pub value: String,
    /// False for attributes that were never explicitly set
    pub specified: bool,
    pub(crate) owner_element: Option<NodeId>,
}

impl AttrData {
    pub fn new(name: QualName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            specified: true,
            owner_element: None,
        }
    }

    pub fn owner_element(&self) -> Option<NodeId> {
        self.owner_element
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document(DocumentData),
    /// DOCTYPE
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    DocumentFragment,
    Element(ElementData),
    Attribute(AttrData),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
    EntityReference {
        name: String,
    },
    Entity {
        name: String,
        public_id: String,
        system_id: String,
        notation_name: String,
    },
    Notation {
        name: String,
        public_id: String,
        system_id: String,
    },
    /// Namespace declaration node
    Namespace {
        prefix: Option<String>,
        uri: String,
    },
}

/// DOM Node - one arena slot
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) owner_document: Option<NodeId>,
    pub(crate) read_only: bool,
    pub(crate) data: NodeData,
    /// Last known position in the parent's child list; may be stale
    pub(crate) index_hint: Cell<usize>,
}

impl Node {
    pub(crate) fn new(data: NodeData, owner_document: Option<NodeId>) -> Self {
        let read_only = matches!(
            data,
            NodeData::DocumentType { .. }
                | NodeData::Entity { .. }
                | NodeData::Notation { .. }
                | NodeData::EntityReference { .. }
        );
        Self {
            parent: None,
            children: Vec::new(),
            owner_document,
            read_only,
            data,
            index_hint: Cell::new(0),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match &self.data {
            NodeData::Document(_) => NodeType::Document,
            NodeData::DocumentType { .. } => NodeType::DocumentType,
            NodeData::DocumentFragment => NodeType::DocumentFragment,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Attribute(_) => NodeType::Attribute,
            NodeData::Text(_) => NodeType::Text,
            NodeData::CData(_) => NodeType::CDataSection,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            NodeData::EntityReference { .. } => NodeType::EntityReference,
            NodeData::Entity { .. } => NodeType::Entity,
            NodeData::Notation { .. } => NodeType::Notation,
            NodeData::Namespace { .. } => NodeType::Namespace,
        }
    }

    /// Node-specific data
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Owned child list, in document order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The creating document (`None` for documents themselves)
    pub fn owner_document(&self) -> Option<NodeId> {
        self.owner_document
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_attr(&self) -> Option<&AttrData> {
        match &self.data {
            NodeData::Attribute(a) => Some(a),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_attr_mut(&mut self) -> Option<&mut AttrData> {
        match &mut self.data {
            NodeData::Attribute(a) => Some(a),
            _ => None,
        }
    }

    #[inline]
    pub fn as_document(&self) -> Option<&DocumentData> {
        match &self.data {
            NodeData::Document(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_document_mut(&mut self) -> Option<&mut DocumentData> {
        match &mut self.data {
            NodeData::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Character data of Text, CDATA and Comment nodes
    #[inline]
    pub fn as_character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_character_data_mut(&mut self) -> Option<&mut String> {
        match &mut self.data {
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => Some(s),
            _ => None,
        }
    }
}
