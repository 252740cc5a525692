//! Element Attributes
//!
//! Attributes are Attr nodes in the arena, referenced from the owning
//! element's ordered attribute list. The string-keyed accessors below are
//! views over those nodes.

use crate::names::validate_name;
use crate::node::{AttrData, ElementData};
use crate::{DomError, DomResult, DomTree, NamedNodeMap, NodeId, QualName};

impl DomTree {
    fn element_data(&self, element: NodeId) -> DomResult<&ElementData> {
        self.node(element)?
            .as_element()
            .ok_or_else(|| DomError::NotSupported(format!("node {} is not an element", element)))
    }

    fn element_data_mut(&mut self, element: NodeId) -> DomResult<&mut ElementData> {
        self.node_mut(element)?
            .as_element_mut()
            .ok_or_else(|| DomError::NotSupported(format!("node {} is not an element", element)))
    }

    fn attr_data(&self, attr: NodeId) -> DomResult<&AttrData> {
        self.node(attr)?
            .as_attr()
            .ok_or_else(|| DomError::NotSupported(format!("node {} is not an attribute", attr)))
    }

    fn html_name(&self, element: NodeId, name: &str) -> String {
        if self.is_html(element) {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    /// `getAttributeNode`
    pub fn get_attribute_node(&self, element: NodeId, name: &str) -> Option<NodeId> {
        let name = self.html_name(element, name);
        let data = self.get(element)?.as_element()?;
        data.attributes.iter().copied().find(|&attr| {
            self.get(attr)
                .and_then(|n| n.as_attr())
                .is_some_and(|a| a.name.matches_qualified(&name))
        })
    }

    /// `getAttributeNodeNS`
    pub fn get_attribute_node_ns(
        &self,
        element: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeId> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let data = self.get(element)?.as_element()?;
        data.attributes.iter().copied().find(|&attr| {
            self.get(attr)
                .and_then(|n| n.as_attr())
                .is_some_and(|a| a.name.namespace() == namespace && a.name.local == local_name)
        })
    }

    /// `getAttribute` (`None` when absent)
    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<String> {
        let attr = self.get_attribute_node(element, name)?;
        self.get(attr)?.as_attr().map(|a| a.value.clone())
    }

    pub fn get_attribute_ns(
        &self,
        element: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<String> {
        let attr = self.get_attribute_node_ns(element, namespace, local_name)?;
        self.get(attr)?.as_attr().map(|a| a.value.clone())
    }

    pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.get_attribute_node(element, name).is_some()
    }

    pub fn has_attribute_ns(
        &self,
        element: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> bool {
        self.get_attribute_node_ns(element, namespace, local_name)
            .is_some()
    }

    pub fn has_attributes(&self, element: NodeId) -> bool {
        self.get(element)
            .and_then(|n| n.as_element())
            .is_some_and(|e| !e.attributes.is_empty())
    }

    /// `attributes`
    pub fn attributes(&self, element: NodeId) -> NamedNodeMap {
        NamedNodeMap::new(element)
    }

    /// `Attr.ownerElement`
    pub fn owner_element(&self, attr: NodeId) -> Option<NodeId> {
        self.get(attr)?.as_attr()?.owner_element
    }

    /// `setAttribute`: returns the previous value, if any
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: &str,
    ) -> DomResult<Option<String>> {
        self.element_data(element)?;
        self.check_writable(element)?;
        if self.error_checking() {
            validate_name(name)?;
        }
        if let Some(attr) = self.get_attribute_node(element, name) {
            return self.update_attr_value(element, attr, value).map(Some);
        }
        let doc = self.attr_document(element)?;
        let name = self.html_name(element, name);
        let attr = self.alloc_attr(doc, AttrData::new(QualName::local(name), value));
        self.attach_attr(element, attr, None)?;
        Ok(None)
    }

    /// `setAttributeNS`: returns the previous value, if any
    pub fn set_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        qualified_name: &str,
        value: &str,
    ) -> DomResult<Option<String>> {
        self.element_data(element)?;
        self.check_writable(element)?;
        let name = self.qualify(namespace, qualified_name, true)?;
        self.set_qualified_attribute(element, name, value)
    }

    /// Attribute write without name validation, for nodes copied from an
    /// already-validated source
    pub(crate) fn set_qualified_attribute(
        &mut self,
        element: NodeId,
        name: QualName,
        value: &str,
    ) -> DomResult<Option<String>> {
        if let Some(attr) = self.get_attribute_node_ns(element, name.namespace(), &name.local) {
            if let Some(a) = self.node_mut(attr)?.as_attr_mut() {
                a.name.prefix = name.prefix;
            }
            return self.update_attr_value(element, attr, value).map(Some);
        }
        let doc = self.attr_document(element)?;
        let attr = self.alloc_attr(doc, AttrData::new(name, value));
        self.attach_attr(element, attr, None)?;
        Ok(None)
    }

    /// `removeAttribute`: returns the removed value, if any
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<Option<String>> {
        self.element_data(element)?;
        self.check_writable(element)?;
        match self.get_attribute_node(element, name) {
            Some(attr) => {
                self.detach_attr(element, attr)?;
                Ok(Some(self.attr_data(attr)?.value.clone()))
            }
            None => Ok(None),
        }
    }

    pub fn remove_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> DomResult<Option<String>> {
        self.element_data(element)?;
        self.check_writable(element)?;
        match self.get_attribute_node_ns(element, namespace, local_name) {
            Some(attr) => {
                self.detach_attr(element, attr)?;
                Ok(Some(self.attr_data(attr)?.value.clone()))
            }
            None => Ok(None),
        }
    }

    /// `setAttributeNode`: returns the Attr it replaced, if any
    pub fn set_attribute_node(&mut self, element: NodeId, attr: NodeId) -> DomResult<Option<NodeId>> {
        let name = self.attr_data(attr)?.name.qualified();
        let existing = self.get_attribute_node(element, &name);
        self.put_attribute_node(element, attr, existing)
    }

    /// `setAttributeNodeNS`: returns the Attr it replaced, if any
    pub fn set_attribute_node_ns(
        &mut self,
        element: NodeId,
        attr: NodeId,
    ) -> DomResult<Option<NodeId>> {
        let name = self.attr_data(attr)?.name.clone();
        let existing = self.get_attribute_node_ns(element, name.namespace(), &name.local);
        self.put_attribute_node(element, attr, existing)
    }

    fn put_attribute_node(
        &mut self,
        element: NodeId,
        attr: NodeId,
        existing: Option<NodeId>,
    ) -> DomResult<Option<NodeId>> {
        self.element_data(element)?;
        let owner = self.attr_data(attr)?.owner_element;
        if owner == Some(element) {
            return Ok(Some(attr));
        }
        if self.error_checking() {
            self.check_writable(element)?;
            if self.document_of(attr) != self.document_of(element) {
                return Err(DomError::WrongDocument(format!(
                    "attribute {} was created by a different document than {}",
                    attr, element
                )));
            }
        }
        if let Some(other) = owner {
            return Err(DomError::InUseAttribute(format!(
                "attribute {} already belongs to element {}",
                attr, other
            )));
        }
        let position = match existing {
            Some(old) => {
                let position = self
                    .element_data(element)?
                    .attributes
                    .iter()
                    .position(|&a| a == old);
                self.detach_attr(element, old)?;
                position
            }
            None => None,
        };
        self.attach_attr(element, attr, position)?;
        Ok(existing)
    }

    /// `removeAttributeNode`
    pub fn remove_attribute_node(&mut self, element: NodeId, attr: NodeId) -> DomResult<NodeId> {
        self.check_writable(element)?;
        if self.attr_data(attr)?.owner_element != Some(element) {
            return Err(DomError::NotFound(format!(
                "attribute {} is not an attribute of {}",
                attr, element
            )));
        }
        self.detach_attr(element, attr)?;
        Ok(attr)
    }

    fn attr_document(&self, element: NodeId) -> DomResult<NodeId> {
        self.document_of(element)
            .ok_or_else(|| DomError::WrongDocument(format!("element {} has no document", element)))
    }

    fn update_attr_value(&mut self, element: NodeId, attr: NodeId, value: &str) -> DomResult<String> {
        let before = self.element_id(element).map(str::to_string);
        let old = match self.node_mut(attr)?.as_attr_mut() {
            Some(a) => {
                a.specified = true;
                std::mem::replace(&mut a.value, value.to_string())
            }
            None => return Err(not_an_attr(attr)),
        };
        self.refresh_id(element, before);
        Ok(old)
    }

    fn attach_attr(&mut self, element: NodeId, attr: NodeId, position: Option<usize>) -> DomResult<()> {
        let before = self.element_id(element).map(str::to_string);
        match self.node_mut(attr)?.as_attr_mut() {
            Some(a) => a.owner_element = Some(element),
            None => return Err(not_an_attr(attr)),
        }
        let attributes = &mut self.element_data_mut(element)?.attributes;
        match position {
            Some(index) if index <= attributes.len() => attributes.insert(index, attr),
            _ => attributes.push(attr),
        }
        self.refresh_id(element, before);
        Ok(())
    }

    fn detach_attr(&mut self, element: NodeId, attr: NodeId) -> DomResult<()> {
        let before = self.element_id(element).map(str::to_string);
        self.element_data_mut(element)?
            .attributes
            .retain(|&a| a != attr);
        if let Some(a) = self.node_mut(attr)?.as_attr_mut() {
            a.owner_element = None;
        }
        self.refresh_id(element, before);
        Ok(())
    }

    /// Keep the document `id` index in step with an element's id change
    fn refresh_id(&mut self, element: NodeId, before: Option<String>) {
        let after = self.element_id(element).map(str::to_string);
        if before == after {
            return;
        }
        let Some(doc) = self.connected_document(element) else {
            return;
        };
        if let Some(old) = before {
            self.evict_element_id(doc, element, &old);
        }
        self.index_element_id(doc, element);
    }
}

fn not_an_attr(id: NodeId) -> DomError {
    DomError::NotSupported(format!("node {} is not an attribute", id))
}
