//! Connection, URI and cookie persistence tests for penv-net

use penv_net::{
    Connection, CookieJar, FileStore, MemoryConnection, MemoryFileStore, Method, Request,
    Response, Url, resolve_uri,
};

// ============================================================================
// CONNECTIONS
// ============================================================================

#[test]
fn test_memory_connection_records_requests() {
    let conn = MemoryConnection::new();
    conn.route(
        "http://api.test/items",
        Response::new(201).with_header("Location", "/items/7"),
    );
    let mut handle = conn.clone();

    let request = Request::post("http://api.test/items")
        .with_json(r#"{"name":"seven"}"#)
        .with_header("X-Trace", "1");
    let response = handle.perform(&request).unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert_eq!(response.header("location"), Some("/items/7"));

    let log = conn.requests();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].method, Method::Post);
    assert_eq!(log[0].header("x-trace"), Some("1"));
}

#[test]
fn test_failed_transfer_becomes_network_error_response() {
    let mut conn = MemoryConnection::new();
    conn.fail("http://down.test/");
    let url = "http://down.test/";
    let response = conn
        .perform(&Request::get(url))
        .unwrap_or_else(|e| Response::network_error(url, &e.to_string()));
    assert!(response.is_network_error());
    assert_eq!(response.status_text, "Network Error");
    assert!(response.text().contains("refused"));
}

// ============================================================================
// URI RESOLUTION
// ============================================================================

#[test]
fn test_resolution_against_document_base() {
    let base = Some("http://example.com/dir/page.html?x=1");
    assert_eq!(
        resolve_uri("../img/logo.png", base).unwrap(),
        "http://example.com/img/logo.png"
    );
    assert_eq!(resolve_uri("", base).unwrap(), "http://example.com/dir/page.html?x=1");
    assert_eq!(resolve_uri("javascript:void(0)", base).unwrap(), "");
}

// ============================================================================
// COOKIES
// ============================================================================

#[test]
fn test_cookie_jar_persists_through_store() {
    let store = MemoryFileStore::new();
    let site = Url::parse("http://shop.example.com/cart/view").unwrap();

    let mut jar = CookieJar::new();
    jar.set_cookie(&site, "cart=42; Path=/cart").unwrap();
    jar.set_cookie(&site, "lang=en; Domain=example.com; Path=/").unwrap();
    jar.save(&store, "/jar.json").unwrap();

    let text = store.read_text("/jar.json").unwrap();
    assert!(text.contains("\"shop.example.com\""));
    assert!(text.contains("\".example.com\""));
    assert!(text.contains("date-created"));

    let restored = CookieJar::load(&store, "/jar.json").unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(
        restored.cookies_for(&site).as_deref(),
        Some("cart=42; lang=en")
    );
    let other = Url::parse("http://www.example.com/").unwrap();
    assert_eq!(restored.cookies_for(&other).as_deref(), Some("lang=en"));
}
