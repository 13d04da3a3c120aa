//! # Session Module
//!
//! `KnowledgeBase`: the shared handle every component is constructed with.
//!
//! It combines a graph store with the keynode cache of that store. The handle
//! is cheap to clone; clones share the same graph and cache, so an operation
//! running on a dispatcher worker thread sees what its caller wrote.
//!
//! Locks are held only for the duration of one closure. Nothing waits on a
//! channel or another thread while holding the graph lock.

use crate::graph::{Graph, GraphStore};
use crate::keynodes::Keynodes;
use crate::{Addr, NodeKind, SemnetError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Element counts reported by `KnowledgeBase::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub elements: usize,
    pub edges: usize,
}

/// Shared graph + keynode cache.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    graph: Arc<RwLock<Graph>>,
    keynodes: Arc<Keynodes>,
}

impl KnowledgeBase {
    /// Wrap an existing graph, creating any missing well-known keynodes.
    pub fn new(mut graph: Graph) -> Result<Self, SemnetError> {
        let keynodes = Keynodes::bootstrap(&mut graph)?;
        Ok(Self {
            graph: Arc::new(RwLock::new(graph)),
            keynodes: Arc::new(keynodes),
        })
    }

    /// Create a knowledge base holding only the well-known keynodes.
    pub fn empty() -> Result<Self, SemnetError> {
        Self::new(Graph::new())
    }

    /// The keynode cache of this knowledge base.
    #[must_use]
    pub fn keynodes(&self) -> &Keynodes {
        &self.keynodes
    }

    /// Run `f` with shared access to the graph.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&Graph, &Keynodes) -> Result<T, SemnetError>,
    ) -> Result<T, SemnetError> {
        let graph = self
            .graph
            .read()
            .map_err(|_| SemnetError::StoreUnavailable("graph lock poisoned".to_string()))?;
        f(&graph, &self.keynodes)
    }

    /// Run `f` with exclusive access to the graph.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut Graph, &Keynodes) -> Result<T, SemnetError>,
    ) -> Result<T, SemnetError> {
        let mut graph = self
            .graph
            .write()
            .map_err(|_| SemnetError::StoreUnavailable("graph lock poisoned".to_string()))?;
        f(&mut graph, &self.keynodes)
    }

    /// Resolve a keynode by identifier.
    pub fn keynode(&self, idtf: &str) -> Result<Addr, SemnetError> {
        self.read(|graph, keynodes| keynodes.resolve(graph, idtf))
    }

    /// Resolve a keynode, creating it as `kind` if missing.
    pub fn keynode_or_create(&self, idtf: &str, kind: NodeKind) -> Result<Addr, SemnetError> {
        self.write(|graph, keynodes| keynodes.resolve_or_create(graph, idtf, kind))
    }

    /// Text content of a link, if `addr` is a text link.
    pub fn link_text(&self, addr: Addr) -> Result<Option<String>, SemnetError> {
        self.read(|graph, _| {
            Ok(graph
                .link_content(addr)?
                .and_then(|content| content.as_text().map(str::to_string)))
        })
    }

    /// Current element counts.
    pub fn stats(&self) -> Result<KnowledgeStats, SemnetError> {
        self.read(|graph, _| {
            Ok(KnowledgeStats {
                elements: graph.element_count()?,
                edges: graph.edge_count()?,
            })
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
