//! CharacterData
//!
//! Offsets and counts are measured in characters.

use crate::node::NodeData;
use crate::{DomError, DomResult, DomTree, NodeId};

fn byte_offset(s: &str, offset: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(offset)
}

fn index_error(offset: usize, len: usize) -> DomError {
    DomError::IndexSize(format!("offset {} exceeds length {}", offset, len))
}

impl DomTree {
    fn char_data(&self, id: NodeId) -> DomResult<&str> {
        self.node(id)?
            .as_character_data()
            .ok_or_else(|| DomError::NotSupported(format!("node {} has no character data", id)))
    }

    /// Byte range for a (offset, count) pair, clipped at the end of the data
    fn char_range(&self, id: NodeId, offset: usize, count: usize) -> DomResult<(usize, usize)> {
        let data = self.char_data(id)?;
        let len = data.chars().count();
        let start = byte_offset(data, offset).ok_or_else(|| index_error(offset, len))?;
        let end = byte_offset(data, offset.saturating_add(count).min(len)).unwrap_or(data.len());
        Ok((start, end))
    }

    /// `CharacterData.data`
    pub fn data(&self, id: NodeId) -> DomResult<&str> {
        self.char_data(id)
    }

    pub fn set_data(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        self.replace_char_data(id, |s| {
            s.clear();
            s.push_str(data);
        })
    }

    /// `CharacterData.length`
    pub fn length(&self, id: NodeId) -> DomResult<usize> {
        Ok(self.char_data(id)?.chars().count())
    }

    pub fn substring_data(&self, id: NodeId, offset: usize, count: usize) -> DomResult<String> {
        let (start, end) = self.char_range(id, offset, count)?;
        Ok(self.char_data(id)?[start..end].to_string())
    }

    pub fn append_data(&mut self, id: NodeId, arg: &str) -> DomResult<()> {
        self.replace_char_data(id, |s| s.push_str(arg))
    }

    pub fn insert_data(&mut self, id: NodeId, offset: usize, arg: &str) -> DomResult<()> {
        let (start, _) = self.char_range(id, offset, 0)?;
        self.replace_char_data(id, |s| s.insert_str(start, arg))
    }

    pub fn delete_data(&mut self, id: NodeId, offset: usize, count: usize) -> DomResult<()> {
        let (start, end) = self.char_range(id, offset, count)?;
        self.replace_char_data(id, |s| {
            s.replace_range(start..end, "");
        })
    }

    pub fn replace_data(
        &mut self,
        id: NodeId,
        offset: usize,
        count: usize,
        arg: &str,
    ) -> DomResult<()> {
        let (start, end) = self.char_range(id, offset, count)?;
        self.replace_char_data(id, |s| s.replace_range(start..end, arg))
    }

    fn replace_char_data(&mut self, id: NodeId, edit: impl FnOnce(&mut String)) -> DomResult<()> {
        self.check_writable(id)?;
        let data = self
            .node_mut(id)?
            .as_character_data_mut()
            .ok_or_else(|| DomError::NotSupported(format!("node {} has no character data", id)))?;
        edit(data);
        Ok(())
    }

    /// `Text.splitText`: keeps `[0, offset)` in `id`, moves the rest into a
    /// new sibling inserted right after it. Returns the new node.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> DomResult<NodeId> {
        self.check_writable(id)?;
        let (start, _) = self.char_range(id, offset, 0)?;
        let doc = self
            .document_of(id)
            .ok_or_else(|| DomError::WrongDocument(format!("node {} has no document", id)))?;

        let node = self.node_mut(id)?;
        let tail = match &mut node.data {
            NodeData::Text(s) => NodeData::Text(s.split_off(start)),
            NodeData::CData(s) => NodeData::CData(s.split_off(start)),
            _ => {
                return Err(DomError::NotSupported(format!(
                    "node {} is not a text node",
                    id
                )));
            }
        };
        let new_node = self.alloc_copy(tail, doc);
        if let Some(parent) = self.parent_node(id) {
            let next = self.next_sibling(id);
            self.insert_before(parent, new_node, next)?;
        }
        Ok(new_node)
    }
}
