//! URI Resolution

use url::Url;

use crate::NetError;

/// `file://<cwd>/`, the base used when a document has none
pub fn cwd_base() -> Result<Url, NetError> {
    let cwd = std::env::current_dir()?;
    Url::from_directory_path(&cwd)
        .map_err(|_| NetError::InvalidUrl(format!("cannot express {} as a URL", cwd.display())))
}

/// Resolve `path` against `base`.
///
/// - `javascript:` URLs resolve to the empty string, meaning "do not load"
/// - `//host/path` takes the scheme of the base (`http:` for file bases)
/// - without a usable base, `file://<cwd>/` is used
pub fn resolve_uri(path: &str, base: Option<&str>) -> Result<String, NetError> {
    let path = path.trim();
    if path
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
    {
        return Ok(String::new());
    }
    if let Ok(absolute) = Url::parse(path) {
        return Ok(absolute.to_string());
    }

    let base = match base
        .filter(|b| !b.is_empty() && *b != "about:blank")
        .and_then(|b| Url::parse(b).ok())
    {
        Some(base) => base,
        None => cwd_base()?,
    };

    if let Some(rest) = path.strip_prefix("//") {
        let scheme = match base.scheme() {
            "file" => "http",
            other => other,
        };
        return Url::parse(&format!("{}://{}", scheme, rest))
            .map(|u| u.to_string())
            .map_err(|e| NetError::InvalidUrl(format!("{}: {}", path, e)));
    }

    base.join(path)
        .map(|u| u.to_string())
        .map_err(|e| NetError::InvalidUrl(format!("{}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths() {
        let base = Some("http://example.com/a/b.html");
        assert_eq!(resolve_uri("c.html", base).unwrap(), "http://example.com/a/c.html");
        assert_eq!(resolve_uri("/root.js", base).unwrap(), "http://example.com/root.js");
        assert_eq!(resolve_uri("?q=1", base).unwrap(), "http://example.com/a/b.html?q=1");
        assert_eq!(resolve_uri("#top", base).unwrap(), "http://example.com/a/b.html#top");
    }

    #[test]
    fn test_absolute_passthrough() {
        assert_eq!(
            resolve_uri("https://other.test/x", Some("http://example.com/")).unwrap(),
            "https://other.test/x"
        );
    }

    #[test]
    fn test_javascript_url() {
        assert_eq!(resolve_uri("javascript:void(0)", None).unwrap(), "");
        assert_eq!(resolve_uri("JavaScript:alert(1)", Some("http://a.test/")).unwrap(), "");
    }

    #[test]
    fn test_protocol_relative() {
        assert_eq!(
            resolve_uri("//cdn.test/lib.js", Some("https://example.com/")).unwrap(),
            "https://cdn.test/lib.js"
        );
        assert_eq!(
            resolve_uri("//cdn.test/lib.js", Some("file:///tmp/page.html")).unwrap(),
            "http://cdn.test/lib.js"
        );
    }

    #[test]
    fn test_default_file_base() {
        let resolved = resolve_uri("page.html", None).unwrap();
        assert!(resolved.starts_with("file://"));
        assert!(resolved.ends_with("/page.html"));
    }
}
