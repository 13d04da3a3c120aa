//! # Core Type Definitions
//!
//! This module contains the element model of the semantic network:
//! - Element addresses (`Addr`)
//! - Element kinds (`NodeKind`, `EdgeType`, `LinkContent`, `Element`)
//! - Error types (`SemnetError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer data only (no floating-point payloads)
//! - Implement `Ord` where they key `BTreeMap`/`BTreeSet` collections

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ADDRESSES
// =============================================================================

/// Address of an element (node, link or edge) in the graph.
///
/// Addresses carry no payload; identity is the only thing they express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Addr(pub u64);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// NODES
// =============================================================================

/// Structural kind of a content-less node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An ordinary entity node.
    #[default]
    Plain,
    /// A class node; its positive access edges point at its members.
    Class,
    /// A relation node (`nrel_*`, `rrel_*`), used only as an edge qualifier.
    Relation,
    /// A structure node grouping a materialized collection.
    Structure,
    /// A tuple node (e.g. a decomposition bundle).
    Tuple,
}

// =============================================================================
// LINKS
// =============================================================================

/// Payload of a content-bearing node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LinkContent {
    Text(String),
    Int(i64),
    Binary(Vec<u8>),
}

impl LinkContent {
    /// Create a text payload.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Get the payload as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for LinkContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// Arity form of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeForm {
    /// Membership edge; may be qualified by a role relation.
    Access,
    /// Pair edge; always named by a relation edge.
    Common,
}

/// Existence vs. explicit absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

/// Permanent edges vs. transient working edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permanence {
    Permanent,
    Temporary,
}

/// Full structural type of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeType {
    pub form: EdgeForm,
    pub polarity: Polarity,
    pub permanence: Permanence,
}

impl EdgeType {
    /// Positive permanent membership edge.
    pub const ACCESS_POS_PERM: Self = Self {
        form: EdgeForm::Access,
        polarity: Polarity::Positive,
        permanence: Permanence::Permanent,
    };

    /// Positive temporary membership edge.
    pub const ACCESS_POS_TEMP: Self = Self {
        form: EdgeForm::Access,
        polarity: Polarity::Positive,
        permanence: Permanence::Temporary,
    };

    /// Negative permanent membership edge (explicit non-membership).
    pub const ACCESS_NEG_PERM: Self = Self {
        form: EdgeForm::Access,
        polarity: Polarity::Negative,
        permanence: Permanence::Permanent,
    };

    /// Directed common edge.
    pub const COMMON: Self = Self {
        form: EdgeForm::Common,
        polarity: Polarity::Positive,
        permanence: Permanence::Permanent,
    };
}

// =============================================================================
// ELEMENT
// =============================================================================

/// A graph element.
///
/// Edges may connect any two elements, including other edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Node(NodeKind),
    Link(LinkContent),
    Edge {
        ty: EdgeType,
        source: Addr,
        target: Addr,
    },
}

impl Element {
    /// Check if the element is an edge.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge { .. })
    }

    /// Get `(type, source, target)` if the element is an edge.
    #[must_use]
    pub fn as_edge(&self) -> Option<(EdgeType, Addr, Addr)> {
        match self {
            Self::Edge { ty, source, target } => Some((*ty, *source, *target)),
            _ => None,
        }
    }

    /// Short human-readable kind name, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Link(_) => "link",
            Self::Edge { .. } => "edge",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the semnet system.
///
/// - No silent failures
/// - Use `Result<T, SemnetError>` for fallible operations
/// - Zero-result searches are not errors; only callers that require a
///   result turn "nothing found" into one of the variants below
#[derive(Debug, Error)]
pub enum SemnetError {
    /// A concrete template slot or edge endpoint is not in the graph.
    #[error("Invalid reference: element {0} does not exist")]
    InvalidReference(Addr),

    /// An element does not satisfy the kind declared for its slot.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A template refers to a variable that no earlier slot declared.
    #[error("Unknown template variable: {0}")]
    UnknownVariable(String),

    /// A template is structurally unusable (empty, too large).
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// No node owns a main identifier with the given text.
    #[error("Entity not found: {0:?}")]
    EntityNotFound(String),

    /// A well-known identifier has no element in this graph.
    #[error("Keynode not found: {0}")]
    KeynodeNotFound(String),

    /// A system identifier is already assigned to another element.
    #[error("Duplicate system identifier: {0}")]
    DuplicateIdentifier(String),

    /// No operation is registered under the identifier.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// An action's argument list does not fit its operation.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// An operation found nothing to put in its result.
    #[error("No result: {0}")]
    NoResult(String),

    /// The invoked operation did not signal completion in time.
    #[error("Operation {operation} timed out after {timeout_ms} ms")]
    OperationTimeout { operation: String, timeout_ms: u64 },

    /// The invoked operation finished with a false status.
    #[error("Operation {operation} failed (action {action})")]
    OperationFailed { operation: String, action: Addr },

    /// A process scheme does not have exactly one start node.
    #[error("Malformed scheme: expected exactly one start node, found {start_nodes}")]
    MalformedScheme { start_nodes: usize },

    /// A scheme step has no display text in the requested language.
    #[error("No description for {element} in {language}")]
    DescriptionNotFound { element: Addr, language: String },

    /// The intent classifier produced unusable output.
    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The shared store handle is unusable (poisoned lock).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

// =============================================================================
// TESTS
// =============================================================================
