//! # Template Module
//!
//! Structural query patterns for the matcher.
//!
//! A template is an ordered list of clauses. Each clause is a triple
//! `(source, edge, target)` or a quintuple, which additionally requires the
//! triple's edge to be the target of an attribute edge leaving a relation
//! node. Slots are concrete addresses, typed variable declarations, or
//! references to a variable declared in an earlier slot.
//!
//! ```
//! use semnet_core::{Addr, EdgeType, Template, Term};
//!
//! let nrel_main_idtf = Addr(1);
//! let link = Addr(2);
//! let template = Template::new().quintuple(
//!     Term::node("entity"),
//!     Term::edge_var(EdgeType::COMMON),
//!     link,
//!     Term::edge_var(EdgeType::ACCESS_POS_PERM),
//!     nrel_main_idtf,
//! );
//! assert_eq!(template.len(), 1);
//! ```

use crate::{Addr, EdgeType, Element, NodeKind, SemnetError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// VARIABLE TYPES
// =============================================================================

/// The kind of element a variable may bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarType {
    /// Any element.
    Element,
    /// Any content-less node.
    Node,
    /// A content-less node of one kind.
    NodeOf(NodeKind),
    /// A link.
    Link,
    /// An edge of exactly this type.
    Edge(EdgeType),
    /// Any edge.
    AnyEdge,
}

impl VarType {
    /// Check whether `element` satisfies this variable type.
    #[must_use]
    pub fn accepts(&self, element: &Element) -> bool {
        match (self, element) {
            (Self::Element, _) => true,
            (Self::Node, Element::Node(_)) => true,
            (Self::NodeOf(kind), Element::Node(k)) => kind == k,
            (Self::Link, Element::Link(_)) => true,
            (Self::Edge(ty), Element::Edge { ty: t, .. }) => ty == t,
            (Self::AnyEdge, Element::Edge { .. }) => true,
            _ => false,
        }
    }

    /// Check whether this type can only bind edges.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge(_) | Self::AnyEdge)
    }

    /// The edge type constraint, if any.
    #[must_use]
    pub fn edge_type(&self) -> Option<EdgeType> {
        match self {
            Self::Edge(ty) => Some(*ty),
            _ => None,
        }
    }
}

// =============================================================================
// TERMS
// =============================================================================

/// One slot of a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A concrete element.
    Fixed(Addr),
    /// A variable declaration. Anonymous variables are never exposed in bindings.
    Var { name: Option<String>, ty: VarType },
    /// A reference to a variable declared earlier in the template.
    Ref(String),
}

impl Term {
    /// Named variable of the given type.
    pub fn var(name: impl Into<String>, ty: VarType) -> Self {
        Self::Var {
            name: Some(name.into()),
            ty,
        }
    }

    /// Named content-less node variable.
    pub fn node(name: impl Into<String>) -> Self {
        Self::var(name, VarType::Node)
    }

    /// Named class-node variable.
    pub fn class(name: impl Into<String>) -> Self {
        Self::var(name, VarType::NodeOf(NodeKind::Class))
    }

    /// Named link variable.
    pub fn link(name: impl Into<String>) -> Self {
        Self::var(name, VarType::Link)
    }

    /// Named edge variable of the given type.
    pub fn edge(name: impl Into<String>, ty: EdgeType) -> Self {
        Self::var(name, VarType::Edge(ty))
    }

    /// Anonymous edge variable of the given type.
    #[must_use]
    pub fn edge_var(ty: EdgeType) -> Self {
        Self::Var {
            name: None,
            ty: VarType::Edge(ty),
        }
    }

    /// Reference to an earlier declaration.
    pub fn refer(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }
}

impl From<Addr> for Term {
    fn from(addr: Addr) -> Self {
        Self::Fixed(addr)
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Self::Ref(name.to_string())
    }
}

// =============================================================================
// CLAUSES & TEMPLATE
// =============================================================================

/// A single pattern clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Triple {
        source: Term,
        edge: Term,
        target: Term,
    },
    Quintuple {
        source: Term,
        edge: Term,
        target: Term,
        attr_edge: Term,
        relation: Term,
    },
}

/// An ordered list of clauses evaluated left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    clauses: Vec<Clause>,
}

impl Template {
    /// Create an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a triple clause.
    #[must_use]
    pub fn triple(
        mut self,
        source: impl Into<Term>,
        edge: impl Into<Term>,
        target: impl Into<Term>,
    ) -> Self {
        self.clauses.push(Clause::Triple {
            source: source.into(),
            edge: edge.into(),
            target: target.into(),
        });
        self
    }

    /// Append a quintuple clause: the triple plus `relation --attr_edge--> edge`.
    #[must_use]
    pub fn quintuple(
        mut self,
        source: impl Into<Term>,
        edge: impl Into<Term>,
        target: impl Into<Term>,
        attr_edge: impl Into<Term>,
        relation: impl Into<Term>,
    ) -> Self {
        self.clauses.push(Clause::Quintuple {
            source: source.into(),
            edge: edge.into(),
            target: target.into(),
            attr_edge: attr_edge.into(),
            relation: relation.into(),
        });
        self
    }

    /// Clauses in evaluation order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Check if the template has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

// =============================================================================
// BINDING
// =============================================================================

/// One satisfying assignment of named variables to elements.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Binding(BTreeMap<String, Addr>);

impl Binding {
    /// Get the element bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Addr> {
        self.0.get(name).copied()
    }

    /// Get the element bound to `name`, failing if the name is not bound.
    pub fn require(&self, name: &str) -> Result<Addr, SemnetError> {
        self.get(name)
            .ok_or_else(|| SemnetError::UnknownVariable(name.to_string()))
    }

    /// Iterate `(name, element)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Addr)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of named variables bound.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, addr: Addr) {
        self.0.insert(name, addr);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkContent;

    #[test]
    fn builder_keeps_clause_order() {
        let template = Template::new()
            .triple(Addr(1), Term::edge_var(EdgeType::ACCESS_POS_PERM), Term::node("x"))
            .triple("x", Term::edge_var(EdgeType::COMMON), Term::node("y"));

        assert_eq!(template.len(), 2);
        assert!(matches!(
            &template.clauses()[1],
            Clause::Triple { source: Term::Ref(name), .. } if name == "x"
        ));
    }

    #[test]
    fn var_type_acceptance() {
        let class = Element::Node(NodeKind::Class);
        let link = Element::Link(LinkContent::text("x"));
        let edge = Element::Edge {
            ty: EdgeType::COMMON,
            source: Addr(1),
            target: Addr(2),
        };

        assert!(VarType::Node.accepts(&class));
        assert!(VarType::NodeOf(NodeKind::Class).accepts(&class));
        assert!(!VarType::NodeOf(NodeKind::Plain).accepts(&class));
        assert!(!VarType::Node.accepts(&link));
        assert!(VarType::Link.accepts(&link));
        assert!(VarType::Edge(EdgeType::COMMON).accepts(&edge));
        assert!(!VarType::Edge(EdgeType::ACCESS_POS_PERM).accepts(&edge));
        assert!(VarType::AnyEdge.accepts(&edge));
        assert!(VarType::Element.accepts(&link));
    }

    #[test]
    fn binding_require_reports_name() {
        let mut binding = Binding::default();
        binding.insert("node".to_string(), Addr(5));

        assert_eq!(binding.require("node").expect("bound"), Addr(5));
        assert!(matches!(
            binding.require("other"),
            Err(SemnetError::UnknownVariable(name)) if name == "other"
        ));
    }
}
