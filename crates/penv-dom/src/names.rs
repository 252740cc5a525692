//! Names and Namespaces
//!
//! XML name validation and qualified-name handling for element and attribute
//! creation.

use crate::{DomError, DomResult};

/// The namespace bound to the reserved `xml:` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// The namespace bound to the reserved `xmlns:` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
/// The XHTML namespace, used for elements of HTML documents.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualName {
    /// Namespace URI (`None` for no namespace)
    pub namespace: Option<String>,
    /// Prefix (`None` when unprefixed)
    pub prefix: Option<String>,
    /// Local name
    pub local: String,
}

impl QualName {
    /// A name without namespace or prefix
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local: name.into(),
        }
    }

    pub fn new(namespace: Option<String>, prefix: Option<String>, local: impl Into<String>) -> Self {
        Self {
            namespace,
            prefix,
            local: local.into(),
        }
    }

    /// `prefix:local`, or just `local`
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Compare against a qualified name string without allocating
    pub fn matches_qualified(&self, qualified: &str) -> bool {
        match &self.prefix {
            Some(prefix) => qualified
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .is_some_and(|local| local == self.local),
            None => qualified == self.local,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

fn is_name_start_char(c: char) -> bool {
    matches!(c, ':' | '_' | 'A'..='Z' | 'a'..='z')
        || matches!(c as u32,
            0xC0..=0xD6 | 0xD8..=0xF6 | 0xF8..=0x2FF | 0x370..=0x37D | 0x37F..=0x1FFF
            | 0x200C..=0x200D | 0x2070..=0x218F | 0x2C00..=0x2FEF | 0x3001..=0xD7FF
            | 0xF900..=0xFDCF | 0xFDF0..=0xFFFD | 0x10000..=0xEFFFF)
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}')
        || matches!(c as u32, 0x300..=0x36F | 0x203F..=0x2040)
}

/// Check the XML `Name` production
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

pub(crate) fn validate_name(name: &str) -> DomResult<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(DomError::InvalidCharacter(format!("'{}' is not a valid name", name)))
    }
}

/// Split `prefix:local`, rejecting malformed qualified names
pub(crate) fn split_qualified_name(qualified: &str) -> DomResult<(Option<&str>, &str)> {
    match qualified.split_once(':') {
        None => Ok((None, qualified)),
        Some((prefix, local)) => {
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                return Err(DomError::Namespace(format!(
                    "'{}' is not a well-formed qualified name",
                    qualified
                )));
            }
            Ok((Some(prefix), local))
        }
    }
}

/// Validate a (namespace, qualified name) pair and build the [`QualName`]
pub(crate) fn validate_qualified_name(
    namespace: Option<&str>,
    qualified: &str,
    is_attribute: bool,
) -> DomResult<QualName> {
    validate_name(qualified)?;
    let namespace = namespace.filter(|ns| !ns.is_empty());
    let (prefix, local) = split_qualified_name(qualified)?;

    if prefix.is_some() && namespace.is_none() {
        return Err(DomError::Namespace(format!(
            "prefix of '{}' requires a namespace URI",
            qualified
        )));
    }
    if prefix == Some("xml") && namespace != Some(XML_NAMESPACE) {
        return Err(DomError::Namespace(
            "the 'xml' prefix is bound to the XML namespace".into(),
        ));
    }
    if is_attribute {
        let is_xmlns = prefix == Some("xmlns") || (prefix.is_none() && local == "xmlns");
        if is_xmlns != (namespace == Some(XMLNS_NAMESPACE)) {
            return Err(DomError::Namespace(
                "'xmlns' names and the XMLNS namespace must be used together".into(),
            ));
        }
    }

    Ok(QualName::new(
        namespace.map(str::to_string),
        prefix.map(str::to_string),
        local,
    ))
}
