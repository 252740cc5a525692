//! Markup Serialization
//!
//! Subtree to markup, for `innerHTML`-style reads and diagnostics.

use std::fmt::Write;

use crate::node::NodeData;
use crate::{DomResult, DomTree, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
}

impl DomTree {
    /// Markup for `node` and its subtree (`outerHTML` for elements)
    pub fn serialize(&self, node: NodeId) -> DomResult<String> {
        let mut out = String::new();
        self.write_node(node, &mut out)?;
        Ok(out)
    }

    /// Markup for the children of `node`
    pub fn inner_html(&self, node: NodeId) -> DomResult<String> {
        self.node(node)?;
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(child, &mut out)?;
        }
        Ok(out)
    }

    fn write_node(&self, id: NodeId, out: &mut String) -> DomResult<()> {
        let node = self.node(id)?;
        match &node.data {
            NodeData::Element(element) => {
                let html = self.is_html(id);
                let tag = element.name.qualified();
                out.push('<');
                out.push_str(&tag);
                for &attr in element.attributes() {
                    if let Some(attr) = self.get(attr).and_then(|n| n.as_attr()) {
                        out.push(' ');
                        out.push_str(&attr.name.qualified());
                        out.push_str("=\"");
                        escape_attr(&attr.value, out);
                        out.push('"');
                    }
                }
                let lower = tag.to_ascii_lowercase();
                if html && VOID_ELEMENTS.contains(&lower.as_str()) {
                    out.push('>');
                    return Ok(());
                }
                if !html && node.children.is_empty() {
                    out.push_str("/>");
                    return Ok(());
                }
                out.push('>');
                let raw = html && RAW_TEXT_ELEMENTS.contains(&lower.as_str());
                for &child in &node.children {
                    match self.get(child).map(|n| &n.data) {
                        Some(NodeData::Text(text)) if raw => out.push_str(text),
                        _ => self.write_node(child, out)?,
                    }
                }
                let _ = write!(out, "</{}>", tag);
            }
            NodeData::Text(text) => escape_text(text, out),
            NodeData::CData(text) => {
                let _ = write!(out, "<![CDATA[{}]]>", text);
            }
            NodeData::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
            NodeData::ProcessingInstruction { target, data } => {
                let _ = write!(out, "<?{} {}?>", target, data);
            }
            NodeData::DocumentType {
                name,
                public_id,
                system_id,
            } => {
                let _ = write!(out, "<!DOCTYPE {}", name);
                if !public_id.is_empty() {
                    let _ = write!(out, " PUBLIC \"{}\"", public_id);
                    if !system_id.is_empty() {
                        let _ = write!(out, " \"{}\"", system_id);
                    }
                } else if !system_id.is_empty() {
                    let _ = write!(out, " SYSTEM \"{}\"", system_id);
                }
                out.push('>');
            }
            NodeData::EntityReference { name } => {
                let _ = write!(out, "&{};", name);
            }
            NodeData::Attribute(attr) => escape_attr(&attr.value, out),
            NodeData::Document(_) | NodeData::DocumentFragment => {
                for &child in &node.children {
                    self.write_node(child, out)?;
                }
            }
            NodeData::Entity { .. } | NodeData::Notation { .. } | NodeData::Namespace { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{DocumentKind, DomTree};

    #[test]
    fn test_serialize_html() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let div = tree.create_element(doc, "div").unwrap();
        tree.set_attribute(div, "title", "a \"b\" & c").unwrap();
        let text = tree.create_text_node(doc, "1 < 2").unwrap();
        let br = tree.create_element(doc, "br").unwrap();
        tree.append_child(div, text).unwrap();
        tree.append_child(div, br).unwrap();

        assert_eq!(
            tree.serialize(div).unwrap(),
            r#"<div title="a &quot;b&quot; &amp; c">1 &lt; 2<br></div>"#
        );
        assert_eq!(tree.inner_html(div).unwrap(), "1 &lt; 2<br>");
    }

    #[test]
    fn test_serialize_script_raw() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Html, "about:blank");
        let script = tree.create_element(doc, "script").unwrap();
        let code = tree.create_text_node(doc, "if (a < b) {}").unwrap();
        tree.append_child(script, code).unwrap();
        assert_eq!(
            tree.serialize(script).unwrap(),
            "<script>if (a < b) {}</script>"
        );
    }

    #[test]
    fn test_serialize_xml() {
        let mut tree = DomTree::new();
        let doc = tree.create_document(DocumentKind::Xml, "about:blank");
        let root = tree.create_element(doc, "root").unwrap();
        let empty = tree.create_element(doc, "empty").unwrap();
        let cdata = tree.create_cdata_section(doc, "<raw>").unwrap();
        tree.append_child(doc, root).unwrap();
        tree.append_child(root, empty).unwrap();
        tree.append_child(root, cdata).unwrap();
        assert_eq!(
            tree.serialize(doc).unwrap(),
            "<root><empty/><![CDATA[<raw>]]></root>"
        );
    }
}
