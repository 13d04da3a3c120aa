//! # Graph Store
//!
//! The deterministic element store for the semnet CORE.
//!
//! This module defines the `GraphStore` trait (the store boundary every
//! component talks to) and `Graph`, its in-memory implementation.
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::matcher::Matcher;
use crate::template::{Binding, Template};
use crate::{Addr, EdgeType, Element, LinkContent, NodeKind, SemnetError};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the primitive graph operations.
///
/// All operations are blocking and return `Result<T, SemnetError>` so that
/// in-memory and remote stores can be used uniformly.
pub trait GraphStore {
    /// Create a content-less node.
    fn create_node(&mut self, kind: NodeKind) -> Result<Addr, SemnetError>;

    /// Create a link holding `content`.
    fn create_link(&mut self, content: LinkContent) -> Result<Addr, SemnetError>;

    /// Create a directed edge. Both endpoints must exist.
    fn create_edge(
        &mut self,
        ty: EdgeType,
        source: Addr,
        target: Addr,
    ) -> Result<Addr, SemnetError>;

    /// Get the element stored at `addr`.
    fn element(&self, addr: Addr) -> Result<Option<Element>, SemnetError>;

    /// Check if an element exists.
    fn contains(&self, addr: Addr) -> Result<bool, SemnetError>;

    /// Edges leaving `addr`, ascending by address.
    fn outgoing(&self, addr: Addr) -> Result<Vec<Addr>, SemnetError>;

    /// Edges entering `addr`, ascending by address.
    fn incoming(&self, addr: Addr) -> Result<Vec<Addr>, SemnetError>;

    /// All edges of the given type, ascending by address.
    fn edges_of_type(&self, ty: Option<EdgeType>) -> Result<Vec<Addr>, SemnetError>;

    /// Content of a link. `Ok(None)` if `addr` is not a link.
    fn link_content(&self, addr: Addr) -> Result<Option<LinkContent>, SemnetError>;

    /// Links whose text content equals `text` exactly.
    fn search_links_by_content(&self, text: &str) -> Result<Vec<Addr>, SemnetError>;

    /// Assign a system identifier. Identifiers are unique per graph.
    fn set_system_idtf(&mut self, addr: Addr, idtf: &str) -> Result<(), SemnetError>;

    /// Find the element carrying a system identifier.
    fn find_by_system_idtf(&self, idtf: &str) -> Result<Option<Addr>, SemnetError>;

    /// Get the system identifier of an element, if it has one.
    fn system_idtf(&self, addr: Addr) -> Result<Option<String>, SemnetError>;

    /// Total number of elements (nodes, links and edges).
    fn element_count(&self) -> Result<usize, SemnetError>;

    /// Number of edges.
    fn edge_count(&self) -> Result<usize, SemnetError>;

    /// Run a template search against this store.
    fn search(&self, template: &Template) -> Result<Vec<Binding>, SemnetError>
    where
        Self: Sized,
    {
        Matcher::search(self, template)
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The in-memory graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
/// No `HashMap` allowed.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Element storage: Addr -> Element
    elements: BTreeMap<Addr, Element>,

    /// Edges leaving an element: source -> {edge}
    outgoing: BTreeMap<Addr, BTreeSet<Addr>>,

    /// Edges entering an element: target -> {edge}
    incoming: BTreeMap<Addr, BTreeSet<Addr>>,

    /// System identifier index, both directions.
    idtf_index: BTreeMap<String, Addr>,
    idtf_of: BTreeMap<Addr, String>,

    /// Text link index: content -> {link}
    text_index: BTreeMap<String, BTreeSet<Addr>>,

    /// Number of edges stored.
    edge_total: usize,

    /// Next available address (0 is never assigned).
    next_addr: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, element: Element) -> Addr {
        self.next_addr = self.next_addr.saturating_add(1);
        let addr = Addr(self.next_addr);
        self.elements.insert(addr, element);
        addr
    }

    /// Get an element by reference (internal, non-Result version).
    #[must_use]
    pub fn get(&self, addr: Addr) -> Option<&Element> {
        self.elements.get(&addr)
    }

    /// Iterate all elements in address order.
    pub fn iter(&self) -> impl Iterator<Item = (Addr, &Element)> {
        self.elements.iter().map(|(a, e)| (*a, e))
    }
}

impl GraphStore for Graph {
    fn create_node(&mut self, kind: NodeKind) -> Result<Addr, SemnetError> {
        Ok(self.allocate(Element::Node(kind)))
    }

    fn create_link(&mut self, content: LinkContent) -> Result<Addr, SemnetError> {
        let text = content.as_text().map(str::to_owned);
        let addr = self.allocate(Element::Link(content));
        if let Some(text) = text {
            self.text_index.entry(text).or_default().insert(addr);
        }
        Ok(addr)
    }

    fn create_edge(
        &mut self,
        ty: EdgeType,
        source: Addr,
        target: Addr,
    ) -> Result<Addr, SemnetError> {
        for endpoint in [source, target] {
            if !self.elements.contains_key(&endpoint) {
                return Err(SemnetError::InvalidReference(endpoint));
            }
        }
        let addr = self.allocate(Element::Edge { ty, source, target });
        self.outgoing.entry(source).or_default().insert(addr);
        self.incoming.entry(target).or_default().insert(addr);
        self.edge_total = self.edge_total.saturating_add(1);
        Ok(addr)
    }

    fn element(&self, addr: Addr) -> Result<Option<Element>, SemnetError> {
        Ok(self.elements.get(&addr).cloned())
    }

    fn contains(&self, addr: Addr) -> Result<bool, SemnetError> {
        Ok(self.elements.contains_key(&addr))
    }

    fn outgoing(&self, addr: Addr) -> Result<Vec<Addr>, SemnetError> {
        Ok(self
            .outgoing
            .get(&addr)
            .into_iter()
            .flatten()
            .copied()
            .collect())
    }

    fn incoming(&self, addr: Addr) -> Result<Vec<Addr>, SemnetError> {
        Ok(self
            .incoming
            .get(&addr)
            .into_iter()
            .flatten()
            .copied()
            .collect())
    }

    fn edges_of_type(&self, ty: Option<EdgeType>) -> Result<Vec<Addr>, SemnetError> {
        Ok(self
            .elements
            .iter()
            .filter_map(|(addr, element)| match element {
                Element::Edge { ty: edge_ty, .. } if ty.is_none_or(|t| t == *edge_ty) => {
                    Some(*addr)
                }
                _ => None,
            })
            .collect())
    }

    fn link_content(&self, addr: Addr) -> Result<Option<LinkContent>, SemnetError> {
        Ok(match self.elements.get(&addr) {
            Some(Element::Link(content)) => Some(content.clone()),
            _ => None,
        })
    }

    fn search_links_by_content(&self, text: &str) -> Result<Vec<Addr>, SemnetError> {
        Ok(self
            .text_index
            .get(text)
            .into_iter()
            .flatten()
            .copied()
            .collect())
    }

    fn set_system_idtf(&mut self, addr: Addr, idtf: &str) -> Result<(), SemnetError> {
        if !self.elements.contains_key(&addr) {
            return Err(SemnetError::InvalidReference(addr));
        }
        match self.idtf_index.get(idtf) {
            Some(&owner) if owner == addr => return Ok(()),
            Some(_) => return Err(SemnetError::DuplicateIdentifier(idtf.to_string())),
            None => {}
        }
        if let Some(previous) = self.idtf_of.insert(addr, idtf.to_string()) {
            self.idtf_index.remove(&previous);
        }
        self.idtf_index.insert(idtf.to_string(), addr);
        Ok(())
    }

    fn find_by_system_idtf(&self, idtf: &str) -> Result<Option<Addr>, SemnetError> {
        Ok(self.idtf_index.get(idtf).copied())
    }

    fn system_idtf(&self, addr: Addr) -> Result<Option<String>, SemnetError> {
        Ok(self.idtf_of.get(&addr).cloned())
    }

    fn element_count(&self) -> Result<usize, SemnetError> {
        Ok(self.elements.len())
    }

    fn edge_count(&self) -> Result<usize, SemnetError> {
        Ok(self.edge_total)
    }
}

// =============================================================================
// TESTS
// =============================================================================
