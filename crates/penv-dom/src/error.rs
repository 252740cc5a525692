//! DOM Exceptions
//!
//! `DOMException` and `EventException` as discriminated error values.

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
///
/// Each variant maps onto a `DOMException` code (see [`DomError::code`]) and
/// carries a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Index size error: {0}")]
    IndexSize(String),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Wrong document: {0}")]
    WrongDocument(String),

    #[error("Invalid character: {0}")]
    InvalidCharacter(String),

    #[error("No modification allowed: {0}")]
    NoModificationAllowed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Attribute in use: {0}")]
    InUseAttribute(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Namespace error: {0}")]
    Namespace(String),
}

impl DomError {
    /// Numeric `DOMException` code
    pub fn code(&self) -> u16 {
        match self {
            Self::IndexSize(_) => 1,
            Self::HierarchyRequest(_) => 3,
            Self::WrongDocument(_) => 4,
            Self::InvalidCharacter(_) => 5,
            Self::NoModificationAllowed(_) => 7,
            Self::NotFound(_) => 8,
            Self::NotSupported(_) => 9,
            Self::InUseAttribute(_) => 10,
            Self::InvalidState(_) => 11,
            Self::Syntax(_) => 12,
            Self::Namespace(_) => 14,
        }
    }

    /// Constant name as exposed on `DOMException`
    pub fn name(&self) -> &'static str {
        match self {
            Self::IndexSize(_) => "INDEX_SIZE_ERR",
            Self::HierarchyRequest(_) => "HIERARCHY_REQUEST_ERR",
            Self::WrongDocument(_) => "WRONG_DOCUMENT_ERR",
            Self::InvalidCharacter(_) => "INVALID_CHARACTER_ERR",
            Self::NoModificationAllowed(_) => "NO_MODIFICATION_ALLOWED_ERR",
            Self::NotFound(_) => "NOT_FOUND_ERR",
            Self::NotSupported(_) => "NOT_SUPPORTED_ERR",
            Self::InUseAttribute(_) => "INUSE_ATTRIBUTE_ERR",
            Self::InvalidState(_) => "INVALID_STATE_ERR",
            Self::Syntax(_) => "SYNTAX_ERR",
            Self::Namespace(_) => "NAMESPACE_ERR",
        }
    }
}

/// Event dispatch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("Unspecified event type: {0}")]
    UnspecifiedEventType(String),
}

impl EventError {
    /// Numeric `EventException` code
    pub fn code(&self) -> u16 {
        match self {
            Self::UnspecifiedEventType(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(DomError::HierarchyRequest(String::new()).code(), 3);
        assert_eq!(DomError::NotFound(String::new()).code(), 8);
        assert_eq!(DomError::Namespace(String::new()).code(), 14);
        assert_eq!(EventError::UnspecifiedEventType(String::new()).code(), 0);
    }

    #[test]
    fn test_display() {
        let err = DomError::WrongDocument("node belongs elsewhere".into());
        assert_eq!(err.to_string(), "Wrong document: node belongs elsewhere");
        assert_eq!(err.name(), "WRONG_DOCUMENT_ERR");
    }
}
