use thiserror::Error;

use crate::types::{ElementId, ElementKind};

/// Result alias used throughout the crate.
pub type Result<T, E = GxlError> = std::result::Result<T, E>;

/// The category an error belongs to. Callers that only care about the broad
/// reason for a rejection match on this instead of on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong child kind, duplicate type/value, missing or disallowed attribute.
    Structure,
    /// Duplicate id or a connection that targets itself.
    Identity,
    /// Tentacles pointing at the wrong thing or across graphs.
    Connectivity,
    /// Unparsable or colliding incidence/declaration order.
    Ordering,
    /// Unparsable atomic payload or a heterogeneous composite.
    Value,
    /// Malformed URI.
    Format,
    /// Unsupported document type identifier.
    Version,
    /// Malformed text, reported before any document-level validation.
    Syntax,
    /// Write refused while dangling tentacles remain.
    Integrity,
    /// A handle or call that does not fit the element it was applied to.
    Usage,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Structure => "structure",
            ErrorCategory::Identity => "identity",
            ErrorCategory::Connectivity => "connectivity",
            ErrorCategory::Ordering => "ordering",
            ErrorCategory::Value => "value",
            ErrorCategory::Format => "format",
            ErrorCategory::Version => "version",
            ErrorCategory::Syntax => "syntax",
            ErrorCategory::Integrity => "integrity",
            ErrorCategory::Usage => "usage",
        };
        f.write_str(s)
    }
}

/// Every way a read, write, or mutation of a [`Document`](crate::Document)
/// can be rejected.
///
/// All rejections happen before anything is changed; a returned error means
/// the document is exactly as it was before the call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GxlError {
    // structure
    #[error("<{child}> is not allowed inside <{parent}>")]
    InvalidChild {
        parent: ElementKind,
        child: ElementKind,
    },

    #[error("<{0}> already has a <type> child")]
    DuplicateType(ElementKind),

    #[error("<attr> already holds a value")]
    DuplicateValue,

    #[error("<attr> must hold exactly one value")]
    MissingValue,

    #[error("<{kind}> requires attribute {name:?}")]
    MissingAttribute { kind: ElementKind, name: String },

    #[error("<{kind}> does not allow attribute {name:?}")]
    DisallowedAttribute { kind: ElementKind, name: String },

    #[error("attribute {name:?} must be one of {expected}, got {value:?}")]
    InvalidAttributeValue {
        name: String,
        value: String,
        expected: String,
    },

    #[error("an <attr> named {0:?} already exists on this element")]
    DuplicateAttrName(String),

    #[error("<rel> requires its graph to have hypergraph=\"true\"")]
    HypergraphRequired,

    #[error("graph {0:?} contains relations; hypergraph cannot be disabled")]
    HypergraphInUse(String),

    #[error("an element cannot be inserted below itself")]
    Cycle,

    #[error("text content is not allowed in <{0}>")]
    UnexpectedText(ElementKind),

    // identity
    #[error("id {0:?} is already used in this document")]
    DuplicateId(String),

    #[error("connection {0:?} cannot target itself")]
    SelfReference(String),

    // connectivity
    #[error("id {0:?} does not name a node, edge, or relation")]
    NotAGraphElement(String),

    #[error("connection to {0:?} crosses top-level graphs")]
    CrossGraph(String),

    #[error("relation end targeting {0:?} needs direction \"in\" or \"out\" in a directed relation")]
    MissingDirection(String),

    #[error("isdirected={isdirected} contradicts edgemode \"{mode}\"")]
    DirectionConflict { mode: String, isdirected: bool },

    // ordering
    #[error("{name} must be an integer, got {value:?}")]
    InvalidOrder { name: String, value: String },

    #[error("{name}={value} is already used at {target:?}")]
    DuplicateOrder {
        name: String,
        value: i64,
        target: String,
    },

    // value
    #[error("{text:?} is not a valid <{kind}> value")]
    InvalidValue { kind: ElementKind, text: String },

    #[error("<{composite}> holds <{expected}> values; cannot add <{found}>")]
    HeterogeneousComposite {
        composite: ElementKind,
        expected: ElementKind,
        found: ElementKind,
    },

    // format
    #[error("invalid URI {0:?}")]
    InvalidUri(String),

    // version
    #[error("unsupported document type {0:?}")]
    UnsupportedDoctype(String),

    // syntax
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    // integrity
    #[error("document has {0} dangling tentacle(s); resolve them before writing")]
    DanglingTentacles(usize),

    // usage
    #[error("unknown element handle {0}")]
    UnknownElement(ElementId),

    #[error("element {0} already has a parent; remove it first")]
    AlreadyAttached(ElementId),

    #[error("element {child} is not a child of {parent}")]
    NotAChild { child: ElementId, parent: ElementId },

    #[error("element {0} changed outside the undo history; the recorded change no longer applies")]
    StaleChange(ElementId),

    #[error("operation requires {expected}, found <{found}>")]
    WrongKind {
        expected: &'static str,
        found: ElementKind,
    },

    #[error("i/o error: {0}")]
    Io(String),
}

impl GxlError {
    /// The broad category of this error.
    pub fn category(&self) -> ErrorCategory {
        use GxlError::*;
        match self {
            InvalidChild { .. }
            | DuplicateType(_)
            | DuplicateValue
            | MissingValue
            | MissingAttribute { .. }
            | DisallowedAttribute { .. }
            | InvalidAttributeValue { .. }
            | DuplicateAttrName(_)
            | HypergraphRequired
            | HypergraphInUse(_)
            | Cycle
            | UnexpectedText(_) => ErrorCategory::Structure,
            DuplicateId(_) | SelfReference(_) => ErrorCategory::Identity,
            NotAGraphElement(_)
            | CrossGraph(_)
            | MissingDirection(_)
            | DirectionConflict { .. } => ErrorCategory::Connectivity,
            InvalidOrder { .. } | DuplicateOrder { .. } => ErrorCategory::Ordering,
            InvalidValue { .. } | HeterogeneousComposite { .. } => ErrorCategory::Value,
            InvalidUri(_) => ErrorCategory::Format,
            UnsupportedDoctype(_) => ErrorCategory::Version,
            Syntax { .. } => ErrorCategory::Syntax,
            DanglingTentacles(_) => ErrorCategory::Integrity,
            UnknownElement(_)
            | AlreadyAttached(_)
            | NotAChild { .. }
            | StaleChange(_)
            | WrongKind { .. }
            | Io(_) => ErrorCategory::Usage,
        }
    }
}

impl From<std::io::Error> for GxlError {
    fn from(e: std::io::Error) -> Self {
        GxlError::Io(e.to_string())
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(GxlError::DuplicateId("n1".into()).category(), ErrorCategory::Identity);
        assert_eq!(GxlError::CrossGraph("n1".into()).category(), ErrorCategory::Connectivity);
        assert_eq!(
            GxlError::DuplicateOrder {
                name: "toorder".into(),
                value: 1,
                target: "n1".into()
            }
            .category(),
            ErrorCategory::Ordering
        );
        assert_eq!(GxlError::InvalidUri("::".into()).category(), ErrorCategory::Format);
        assert_eq!(GxlError::DanglingTentacles(2).category(), ErrorCategory::Integrity);
    }

    #[test]
    fn messages_name_the_offender() {
        let e = GxlError::InvalidChild {
            parent: ElementKind::Node,
            child: ElementKind::Node,
        };
        assert_eq!(e.to_string(), "<node> is not allowed inside <node>");
        let e = GxlError::InvalidValue {
            kind: ElementKind::Int,
            text: "x".into(),
        };
        assert_eq!(e.to_string(), "\"x\" is not a valid <int> value");
    }
}
