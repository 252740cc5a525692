//! Tree invariant and event ordering tests for penv-dom
//!
//! Mutation sequences, re-parenting, fragments, cycles, cloning and the
//! id index, plus dispatch ordering through a minimal event context.

use penv_dom::events::{
    Event, EventContext, EventListener, EventTarget, ListenerRegistry, Propagation,
    dispatch_event,
};
use penv_dom::{DocumentKind, DomError, DomTree, NodeId};

fn new_doc() -> (DomTree, NodeId) {
    let mut tree = DomTree::new();
    let doc = tree.create_document(DocumentKind::Html, "about:blank");
    (tree, doc)
}

/// firstChild/nextSibling walk == childNodes, and every child points back
fn check_invariant(tree: &DomTree, root: NodeId) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let mut walked = Vec::new();
        let mut cursor = tree.first_child(node);
        while let Some(child) = cursor {
            assert_eq!(tree.parent_node(child), Some(node), "bad parent for {}", child);
            walked.push(child);
            cursor = tree.next_sibling(child);
        }
        assert_eq!(walked.as_slice(), tree.children(node));
        assert_eq!(tree.child_nodes(node).to_vec(tree), walked);
        assert_eq!(tree.last_child(node), walked.last().copied());
        stack.extend(walked);
    }
}

// ============================================================================
// TREE INVARIANT
// ============================================================================

#[test]
fn test_invariant_over_mutation_sequence() {
    let (mut tree, doc) = new_doc();
    let root = tree.create_element(doc, "div").unwrap();
    let pool: Vec<NodeId> = (0..12)
        .map(|i| tree.create_element(doc, if i % 2 == 0 { "p" } else { "span" }).unwrap())
        .collect();

    // deterministic pseudo-random sequence
    let mut seed: u32 = 7;
    let mut next = move |bound: usize| {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (seed >> 16) as usize % bound
    };

    for _ in 0..300 {
        let node = pool[next(pool.len())];
        let parent_pick = next(pool.len() + 1);
        let parent = if parent_pick == pool.len() { root } else { pool[parent_pick] };
        let result = match next(4) {
            0 => tree.append_child(parent, node),
            1 => {
                let reference = tree.children(parent).first().copied();
                tree.insert_before(parent, node, reference)
            }
            2 => match tree.parent_node(node) {
                Some(p) => tree.remove_child(p, node),
                None => Ok(node),
            },
            _ => match tree.children(parent).last().copied() {
                Some(old) => tree.replace_child(parent, node, old),
                None => Ok(node),
            },
        };
        if let Err(err) = result {
            assert!(matches!(err, DomError::HierarchyRequest(_)), "unexpected {:?}", err);
        }
        check_invariant(&tree, root);
        for &n in &pool {
            check_invariant(&tree, n);
        }
    }
}

#[test]
fn test_reparenting_moves_exactly_one() {
    let (mut tree, doc) = new_doc();
    let a = tree.create_element(doc, "div").unwrap();
    let b = tree.create_element(doc, "div").unwrap();
    let kids: Vec<_> = (0..3).map(|_| tree.create_element(doc, "i").unwrap()).collect();
    for &k in &kids {
        tree.append_child(a, k).unwrap();
    }
    let b_kid = tree.create_element(doc, "i").unwrap();
    tree.append_child(b, b_kid).unwrap();

    let live_nodes = tree.len();
    tree.append_child(b, kids[1]).unwrap();
    assert_eq!(tree.children(a).len(), 2);
    assert_eq!(tree.children(b).len(), 2);
    assert_eq!(tree.len(), live_nodes);
    assert_eq!(tree.children(a), &[kids[0], kids[2]]);
}

#[test]
fn test_fragment_children_spliced() {
    let (mut tree, doc) = new_doc();
    let target = tree.create_element(doc, "ul").unwrap();
    let frag = tree.create_document_fragment(doc).unwrap();
    for _ in 0..5 {
        let li = tree.create_element(doc, "li").unwrap();
        tree.append_child(frag, li).unwrap();
    }
    tree.append_child(target, frag).unwrap();
    assert_eq!(tree.children(target).len(), 5);
    assert_eq!(tree.children(frag).len(), 0);
    assert_eq!(tree.parent_node(frag), None);
    check_invariant(&tree, target);
}

#[test]
fn test_cycle_rejection_is_atomic() {
    let (mut tree, doc) = new_doc();
    let a = tree.create_element(doc, "div").unwrap();
    let b = tree.create_element(doc, "div").unwrap();
    let c = tree.create_element(doc, "div").unwrap();
    tree.append_child(a, b).unwrap();
    tree.append_child(b, c).unwrap();

    let before: Vec<_> = [a, b, c].iter().map(|&n| tree.children(n).to_vec()).collect();
    let err = tree.append_child(c, a).unwrap_err();
    assert_eq!(err.code(), 3);
    let after: Vec<_> = [a, b, c].iter().map(|&n| tree.children(n).to_vec()).collect();
    assert_eq!(before, after);
    assert_eq!(tree.parent_node(a), None);
}

// ============================================================================
// CLONING
// ============================================================================

#[test]
fn test_clone_round_trip() {
    let (mut tree, doc) = new_doc();
    let table = tree.create_element(doc, "table").unwrap();
    tree.set_attribute(table, "class", "grid").unwrap();
    for row in 0..3 {
        let tr = tree.create_element(doc, "tr").unwrap();
        tree.set_attribute(tr, "data-row", &row.to_string()).unwrap();
        let text = tree.create_text_node(doc, &format!("row {}", row)).unwrap();
        tree.append_child(tr, text).unwrap();
        tree.append_child(table, tr).unwrap();
    }

    let copy = tree.clone_node(table, true).unwrap();
    assert!(tree.is_equal_node(table, copy));
    assert_eq!(tree.serialize(table).unwrap(), tree.serialize(copy).unwrap());

    let originals = tree.descendants(table);
    for node in tree.descendants(copy) {
        assert!(!originals.contains(&node));
    }

    // discarding the copy leaves the original intact
    tree.discard(copy).unwrap();
    assert_eq!(tree.children(table).len(), 3);
    assert_eq!(tree.text_content(table).unwrap().as_deref(), Some("row 0row 1row 2"));
}

// ============================================================================
// DOCUMENT SCENARIOS
// ============================================================================

#[test]
fn test_get_element_by_id_scenario() {
    let (mut tree, doc) = new_doc();
    let el = tree.create_element(doc, "div").unwrap();
    tree.append_child(doc, el).unwrap();
    tree.set_attribute(el, "id", "x").unwrap();
    assert_eq!(tree.get_element_by_id(doc, "x"), Some(el));

    tree.remove_child(doc, el).unwrap();
    assert_eq!(tree.get_element_by_id(doc, "x"), None);
}

#[test]
fn test_get_element_by_id_nested_subtree() {
    let (mut tree, doc) = new_doc();
    let html = tree.create_element(doc, "html").unwrap();
    tree.append_child(doc, html).unwrap();
    let section = tree.create_element(doc, "section").unwrap();
    let inner = tree.create_element(doc, "p").unwrap();
    tree.set_attribute(inner, "id", "deep").unwrap();
    tree.append_child(section, inner).unwrap();

    tree.append_child(html, section).unwrap();
    assert_eq!(tree.get_element_by_id(doc, "deep"), Some(inner));
    tree.remove_child(html, section).unwrap();
    assert_eq!(tree.get_element_by_id(doc, "deep"), None);
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Default)]
struct Page {
    dom: DomTree,
    listeners: ListenerRegistry<Page>,
    calls: Vec<&'static str>,
}

impl EventContext for Page {
    fn dom(&self) -> &DomTree {
        &self.dom
    }

    fn listeners(&self) -> &ListenerRegistry<Self> {
        &self.listeners
    }

    fn listeners_mut(&mut self) -> &mut ListenerRegistry<Self> {
        &mut self.listeners
    }
}

fn mark(label: &'static str) -> EventListener<Page> {
    EventListener::new(move |page: &mut Page, _event: &mut Event| {
        page.calls.push(label);
        Ok(Propagation::Continue)
    })
}

fn three_levels(page: &mut Page) -> (NodeId, NodeId, NodeId) {
    let doc = page.dom.create_document(DocumentKind::Html, "about:blank");
    let grandparent = page.dom.create_element(doc, "div").unwrap();
    let parent = page.dom.create_element(doc, "div").unwrap();
    let child = page.dom.create_element(doc, "div").unwrap();
    page.dom.append_child(doc, grandparent).unwrap();
    page.dom.append_child(grandparent, parent).unwrap();
    page.dom.append_child(parent, child).unwrap();
    (grandparent, parent, child)
}

#[test]
fn test_event_order_capture_target_bubble() {
    let mut page = Page::default();
    let (grandparent, parent, child) = three_levels(&mut page);
    page.listeners.add(EventTarget::Node(parent), "ping", mark("parent"), false);
    page.listeners.add(EventTarget::Node(child), "ping", mark("child"), false);
    page.listeners.add(EventTarget::Node(grandparent), "ping", mark("grandparent"), true);

    let mut event = Event::new("ping", true, false);
    dispatch_event(&mut page, EventTarget::Node(child), &mut event).unwrap();
    assert_eq!(page.calls, vec!["grandparent", "child", "parent"]);
}

#[test]
fn test_listener_idempotence() {
    let mut page = Page::default();
    let (_, _, child) = three_levels(&mut page);
    let listener = mark("once");
    page.listeners.add(EventTarget::Node(child), "ping", listener.clone(), false);
    page.listeners.add(EventTarget::Node(child), "ping", listener, false);

    let mut event = Event::new("ping", true, false);
    dispatch_event(&mut page, EventTarget::Node(child), &mut event).unwrap();
    assert_eq!(page.calls, vec!["once"]);
}

#[test]
fn test_capture_stop_prevents_bubble() {
    let mut page = Page::default();
    let (grandparent, parent, child) = three_levels(&mut page);
    page.listeners.add(
        EventTarget::Node(grandparent),
        "ping",
        EventListener::new(|page: &mut Page, _event: &mut Event| {
            page.calls.push("stopper");
            Ok(Propagation::Stop)
        }),
        true,
    );
    page.listeners.add(EventTarget::Node(parent), "ping", mark("parent"), false);
    page.listeners.add(EventTarget::Node(grandparent), "ping", mark("grandparent"), false);

    let mut event = Event::new("ping", true, false);
    dispatch_event(&mut page, EventTarget::Node(child), &mut event).unwrap();
    assert_eq!(page.calls, vec!["stopper"]);
}

#[test]
fn test_removed_listener_not_called_next_time() {
    let mut page = Page::default();
    let (_, _, child) = three_levels(&mut page);
    let listener = mark("gone");
    page.listeners.add(EventTarget::Node(child), "ping", listener.clone(), false);
    assert!(page.listeners.remove(EventTarget::Node(child), "ping", &listener, false));

    let mut event = Event::new("ping", true, false);
    dispatch_event(&mut page, EventTarget::Node(child), &mut event).unwrap();
    assert!(page.calls.is_empty());
}
