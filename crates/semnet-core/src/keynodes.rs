//! # Keynodes
//!
//! Per-connection cache of well-known nodes.
//!
//! A keynode identifier resolves to exactly one node per graph. Lookups are
//! idempotent, so the cache is filled lazily and never invalidated; two
//! concurrent resolutions of the same identifier only do redundant work.

use crate::graph::GraphStore;
use crate::primitives::{self, keynodes};
use crate::{Addr, NodeKind, SemnetError};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Identifier → node cache owned by one knowledge base.
#[derive(Debug, Default)]
pub struct Keynodes {
    cache: RwLock<BTreeMap<String, Addr>>,
}

impl Keynodes {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every well-known relation and class that the graph lacks and
    /// return a cache pre-filled with all of them.
    pub fn bootstrap<G: GraphStore>(graph: &mut G) -> Result<Self, SemnetError> {
        let cache = Self::new();
        for idtf in keynodes::RELATIONS {
            cache.resolve_or_create(graph, idtf, NodeKind::Relation)?;
        }
        for idtf in keynodes::CLASSES {
            cache.resolve_or_create(graph, idtf, NodeKind::Class)?;
        }
        tracing::debug!(cached = cache.len()?, "keynodes bootstrapped");
        Ok(cache)
    }

    /// Resolve `idtf`, memoizing the result.
    pub fn resolve<G: GraphStore>(&self, graph: &G, idtf: &str) -> Result<Addr, SemnetError> {
        if let Some(addr) = self.cached(idtf)? {
            return Ok(addr);
        }
        let addr = graph
            .find_by_system_idtf(idtf)?
            .ok_or_else(|| SemnetError::KeynodeNotFound(idtf.to_string()))?;
        self.remember(idtf, addr)?;
        Ok(addr)
    }

    /// Like `resolve`, but an identifier the graph lacks gives `None`.
    pub fn find<G: GraphStore>(&self, graph: &G, idtf: &str) -> Result<Option<Addr>, SemnetError> {
        match self.resolve(graph, idtf) {
            Ok(addr) => Ok(Some(addr)),
            Err(SemnetError::KeynodeNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve `idtf`, creating a node of `kind` under that identifier if
    /// the graph has none.
    pub fn resolve_or_create<G: GraphStore>(
        &self,
        graph: &mut G,
        idtf: &str,
        kind: NodeKind,
    ) -> Result<Addr, SemnetError> {
        match self.resolve(graph, idtf) {
            Ok(addr) => Ok(addr),
            Err(SemnetError::KeynodeNotFound(_)) => {
                let addr = graph.create_node(kind)?;
                graph.set_system_idtf(addr, idtf)?;
                self.remember(idtf, addr)?;
                Ok(addr)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve the `index`-th ordinal role relation (`rrel_<index>`).
    pub fn ordinal<G: GraphStore>(&self, graph: &G, index: usize) -> Result<Addr, SemnetError> {
        self.resolve(graph, &primitives::ordinal_idtf(index))
    }

    /// Resolve or create the `index`-th ordinal role relation.
    pub fn ordinal_or_create<G: GraphStore>(
        &self,
        graph: &mut G,
        index: usize,
    ) -> Result<Addr, SemnetError> {
        self.resolve_or_create(graph, &primitives::ordinal_idtf(index), NodeKind::Relation)
    }

    /// Number of cached identifiers.
    pub fn len(&self) -> Result<usize, SemnetError> {
        Ok(self.read_cache()?.len())
    }

    /// Check if nothing is cached yet.
    pub fn is_empty(&self) -> Result<bool, SemnetError> {
        Ok(self.read_cache()?.is_empty())
    }

    fn cached(&self, idtf: &str) -> Result<Option<Addr>, SemnetError> {
        Ok(self.read_cache()?.get(idtf).copied())
    }

    fn remember(&self, idtf: &str, addr: Addr) -> Result<(), SemnetError> {
        self.cache
            .write()
            .map_err(|_| SemnetError::StoreUnavailable("keynode cache poisoned".to_string()))?
            .insert(idtf.to_string(), addr);
        Ok(())
    }

    fn read_cache(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Addr>>, SemnetError> {
        self.cache
            .read()
            .map_err(|_| SemnetError::StoreUnavailable("keynode cache poisoned".to_string()))
    }
}
