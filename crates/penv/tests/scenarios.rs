//! End-to-end scenarios through the facade crate

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use penv::dom::events::{Event, EventListener, EventTarget, Propagation};
use penv::dom::{DocumentKind, DomError, DomTree};
use penv::net::MemoryConnection;
use penv::{Clock, ManualClock, Window, XhrReadyState};

fn window_with(connection: &MemoryConnection, clock: &ManualClock) -> Window {
    Window::builder()
        .clock(clock.clone())
        .connection(connection.clone())
        .build()
        .unwrap()
}

// ============================================================================
// DOCUMENT SCENARIOS
// ============================================================================

#[test]
fn test_get_element_by_id_follows_tree() {
    let mut dom = DomTree::new();
    let doc = dom.create_document(DocumentKind::Html, "about:blank");
    let el = dom.create_element(doc, "div").unwrap();
    dom.append_child(doc, el).unwrap();
    dom.set_attribute(el, "id", "x").unwrap();
    assert_eq!(dom.get_element_by_id(doc, "x"), Some(el));

    dom.remove_child(doc, el).unwrap();
    assert_eq!(dom.get_element_by_id(doc, "x"), None);
}

#[test]
fn test_cycle_rejected_without_mutation() {
    let mut dom = DomTree::new();
    let doc = dom.create_document(DocumentKind::Html, "about:blank");
    let outer = dom.create_element(doc, "div").unwrap();
    let inner = dom.create_element(doc, "span").unwrap();
    dom.append_child(outer, inner).unwrap();

    let err = dom.append_child(inner, outer).unwrap_err();
    assert!(matches!(err, DomError::HierarchyRequest(_)));
    assert_eq!(err.code(), 3);
    assert_eq!(dom.children(outer), &[inner]);
    assert!(dom.children(inner).is_empty());
}

#[test]
fn test_deep_clone_is_equal_but_distinct() {
    let mut window = Window::builder().without_parser().build().unwrap();
    let doc = window.document();
    let dom = window.dom_mut();
    let list = dom.create_element(doc, "ul").unwrap();
    dom.set_attribute(list, "class", "menu").unwrap();
    for label in ["one", "two"] {
        let item = dom.create_element(doc, "li").unwrap();
        let text = dom.create_text_node(doc, label).unwrap();
        dom.append_child(item, text).unwrap();
        dom.append_child(list, item).unwrap();
    }

    let copy = dom.clone_node(list, true).unwrap();
    assert!(dom.is_equal_node(list, copy));
    assert_ne!(dom.children(list)[0], dom.children(copy)[0]);
    dom.set_attribute(copy, "class", "other").unwrap();
    assert_eq!(dom.get_attribute(list, "class").as_deref(), Some("menu"));
}

// ============================================================================
// EVENT SCENARIOS
// ============================================================================

#[test]
fn test_capture_target_bubble_order() {
    let mut window = Window::builder().without_parser().build().unwrap();
    let doc = window.document();
    let body = window.dom().body(doc).unwrap();
    let (grandparent, parent, child) = {
        let dom = window.dom_mut();
        let g = dom.create_element(doc, "div").unwrap();
        let p = dom.create_element(doc, "p").unwrap();
        let c = dom.create_element(doc, "span").unwrap();
        dom.append_child(p, c).unwrap();
        dom.append_child(g, p).unwrap();
        (g, p, c)
    };
    window.append_child(body, grandparent).unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    for (node, label, capture) in [
        (grandparent, "grandparent", true),
        (parent, "parent", false),
        (child, "child", false),
    ] {
        let log = order.clone();
        let listener = EventListener::new(move |_: &mut Window, _: &mut Event| {
            log.borrow_mut().push(label);
            Ok(Propagation::Continue)
        });
        window.add_event_listener(node, "poke", listener.clone(), capture);
        // Registering twice is a no-op
        window.add_event_listener(node, "poke", listener, capture);
    }

    let mut event = Event::new("poke", true, true);
    window.dispatch_event(child, &mut event).unwrap();
    assert_eq!(*order.borrow(), vec!["grandparent", "child", "parent"]);
}

#[test]
fn test_capture_stop_prevents_bubble() {
    let mut window = Window::builder().without_parser().build().unwrap();
    let doc = window.document();
    let body = window.dom().body(doc).unwrap();
    let bubbled = Rc::new(Cell::new(false));

    window.add_event_listener(
        EventTarget::Window,
        "poke",
        EventListener::new(|_, _| Ok(Propagation::Stop)),
        true,
    );
    let flag = bubbled.clone();
    window.add_event_listener(
        doc,
        "poke",
        EventListener::new(move |_, _| {
            flag.set(true);
            Ok(Propagation::Continue)
        }),
        false,
    );

    let mut event = Event::new("poke", true, true);
    window.dispatch_event(body, &mut event).unwrap();
    assert!(!bubbled.get());
}

// ============================================================================
// SCRIPTED PAGES
// ============================================================================

#[test]
fn test_script_timer_updates_document() {
    let connection = MemoryConnection::new();
    connection.route_text(
        "http://app.test/",
        "text/html",
        r#"<body><p id="status">loading</p><script>start</script></body>"#,
    );
    let clock = ManualClock::new();
    let mut window = Window::builder()
        .clock(clock.clone())
        .connection(connection.clone())
        .evaluator(|window: &mut Window, _: &str, _: &str| -> anyhow::Result<()> {
            window.set_timeout(
                |window| {
                    let doc = window.document();
                    let status = window
                        .dom()
                        .get_element_by_id(doc, "status")
                        .ok_or_else(|| anyhow::anyhow!("no status element"))?;
                    let text = window.dom().children(status)[0];
                    window.set_data(text, "ready")?;
                    Ok(())
                },
                250,
            );
            Ok(())
        })
        .build()
        .unwrap();

    window.assign("http://app.test/").unwrap();
    let doc = window.document();
    let status = window.dom().get_element_by_id(doc, "status").unwrap();
    assert_eq!(window.dom().text_content(status).unwrap().as_deref(), Some("loading"));

    window.wait(None);
    assert_eq!(window.dom().text_content(status).unwrap().as_deref(), Some("ready"));
    assert_eq!(clock.now_ms(), 250);
}

#[test]
fn test_async_xhr_callback_mutates_dom() {
    let connection = MemoryConnection::new();
    connection.route_text("http://app.test/", "text/html", "<ul id=\"items\"></ul>");
    connection.route_text("http://app.test/items.txt", "text/plain", "alpha\nbeta");
    let clock = ManualClock::new();
    let mut window = window_with(&connection, &clock);
    window.assign("http://app.test/").unwrap();

    let xhr = window.xhr_create();
    window
        .xhr_set_onreadystatechange(xhr, |window, handle| {
            let Some(request) = window.xhr(handle) else {
                return Ok(());
            };
            if request.ready_state() != XhrReadyState::Done {
                return Ok(());
            }
            let lines: Vec<String> = request.response_text().lines().map(String::from).collect();
            let doc = window.document();
            let list = window
                .dom()
                .get_element_by_id(doc, "items")
                .ok_or_else(|| anyhow::anyhow!("missing list"))?;
            for line in lines {
                let item = window.dom_mut().create_element(doc, "li")?;
                let text = window.dom_mut().create_text_node(doc, &line)?;
                window.dom_mut().append_child(item, text)?;
                window.append_child(list, item)?;
            }
            Ok(())
        })
        .unwrap();
    window.xhr_open(xhr, "GET", "items.txt", true, None, None).unwrap();
    window.xhr_send(xhr, None).unwrap();

    let doc = window.document();
    let list = window.dom().get_element_by_id(doc, "items").unwrap();
    assert!(window.dom().children(list).is_empty());

    window.wait(None);
    assert_eq!(window.dom().children(list).len(), 2);
    assert_eq!(
        window.dom().serialize(list).unwrap(),
        "<ul id=\"items\"><li>alpha</li><li>beta</li></ul>"
    );
}
