//! Parser and script seams
//!
//! The window never parses markup or runs script itself. It hands source text
//! to an [`HtmlParser`] that builds nodes into a document and reports each
//! completed element through [`Window::element_popped`], and hands script
//! text to a [`ScriptEvaluator`].

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use penv_dom::NodeId;
use penv_dom::events::CallbackError;

use crate::Window;

/// `parseHtmlInto`: build `source` into the (empty) document `doc`
pub trait HtmlParser {
    fn parse_into(&self, window: &mut Window, source: &str, doc: NodeId)
    -> Result<(), CallbackError>;
}

/// Executes script text on behalf of `<script>` elements
pub trait ScriptEvaluator {
    fn evaluate(&self, window: &mut Window, source: &str, url: &str) -> Result<(), CallbackError>;
}

impl<F> ScriptEvaluator for F
where
    F: Fn(&mut Window, &str, &str) -> Result<(), CallbackError>,
{
    fn evaluate(&self, window: &mut Window, source: &str, url: &str) -> Result<(), CallbackError> {
        self(window, source, url)
    }
}

/// HTML5 parser
///
/// Uses html5ever's RcDom and converts it node by node, so every element is
/// complete (children attached) when it is reported as popped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Html5everParser;

impl HtmlParser for Html5everParser {
    fn parse_into(
        &self,
        window: &mut Window,
        source: &str,
        doc: NodeId,
    ) -> Result<(), CallbackError> {
        tracing::debug!("Parsing {} bytes of HTML", source.len());
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut source.as_bytes())?;
        convert_node(window, &dom.document, doc, doc);
        tracing::debug!("Parsed document {} ({} nodes in arena)", doc, window.dom.len());
        Ok(())
    }
}

fn convert_children(window: &mut Window, handle: &Handle, doc: NodeId, parent: NodeId) {
    for child in handle.children.borrow().iter() {
        convert_node(window, child, doc, parent);
    }
}

fn convert_node(window: &mut Window, handle: &Handle, doc: NodeId, parent: NodeId) {
    match &handle.data {
        RcNodeData::Document => convert_children(window, handle, doc, parent),
        RcNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            let created = window
                .dom
                .create_document_type(doc, name, public_id, system_id);
            attach(window, parent, created);
        }
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            let created = window.dom.create_text_node(doc, &text);
            attach(window, parent, created);
        }
        RcNodeData::Comment { contents } => {
            let created = window.dom.create_comment(doc, contents);
            attach(window, parent, created);
        }
        RcNodeData::ProcessingInstruction { target, contents } => {
            let created = window
                .dom
                .create_processing_instruction(doc, target, contents);
            attach(window, parent, created);
        }
        RcNodeData::Element { name, attrs, .. } => {
            let namespace = name.ns.to_string();
            let namespace = (!namespace.is_empty()).then_some(namespace);
            let qualified = match &name.prefix {
                Some(prefix) => format!("{}:{}", prefix, name.local),
                None => name.local.to_string(),
            };

            let element = match window
                .dom
                .create_element_ns(doc, namespace.as_deref(), &qualified)
            {
                Ok(element) => element,
                Err(err) => {
                    // Keep the content, lose the wrapper
                    tracing::debug!("Skipping element <{}>: {}", qualified, err);
                    convert_children(window, handle, doc, parent);
                    return;
                }
            };

            for attr in attrs.borrow().iter() {
                let attr_ns = attr.name.ns.to_string();
                let attr_name = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                let result = if attr_ns.is_empty() {
                    window.dom.set_attribute(element, &attr_name, &attr.value)
                } else {
                    window
                        .dom
                        .set_attribute_ns(element, Some(&attr_ns), &attr_name, &attr.value)
                };
                if let Err(err) = result {
                    tracing::debug!("Dropping attribute {}: {}", attr_name, err);
                }
            }

            if !attach(window, parent, Ok(element)) {
                return;
            }
            convert_children(window, handle, doc, element);
            window.element_popped(namespace.as_deref(), &name.local, element);
        }
    }
}

fn attach(window: &mut Window, parent: NodeId, created: penv_dom::DomResult<NodeId>) -> bool {
    let result = created.and_then(|node| window.dom.append_child(parent, node));
    match result {
        Ok(_) => true,
        Err(err) => {
            tracing::debug!("Dropping parsed node under {}: {}", parent, err);
            false
        }
    }
}
