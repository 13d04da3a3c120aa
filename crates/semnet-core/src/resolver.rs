//! # Entity Resolver
//!
//! Maps a free-text name to the node whose main identifier has exactly that
//! text.
//!
//! 1. Find every link whose content equals the name (exact, case-sensitive).
//! 2. For each candidate link, match `node --common--> link` qualified by
//!    `nrel_main_idtf`; the first candidate with a binding wins.
//!
//! Candidates are tried in ascending address order, so the answer for an
//! unchanged graph is stable. It is the first owner found, not a "best" one.

use crate::graph::GraphStore;
use crate::keynodes::Keynodes;
use crate::matcher::Matcher;
use crate::primitives::{MAX_NAME_LENGTH, keynodes};
use crate::session::KnowledgeBase;
use crate::template::{Template, Term};
use crate::{Addr, EdgeType, SemnetError};

/// Resolve `name` against `graph`.
pub fn resolve_entity<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    name: &str,
) -> Result<Addr, SemnetError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(SemnetError::EntityNotFound(name.to_string()));
    }

    let nrel_main_idtf = keynodes.resolve(graph, keynodes::NREL_MAIN_IDTF)?;
    let candidates = graph.search_links_by_content(name)?;

    for link in &candidates {
        let template = Template::new().quintuple(
            Term::node("entity"),
            Term::edge_var(EdgeType::COMMON),
            *link,
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            nrel_main_idtf,
        );
        if let Some(binding) = Matcher::first(graph, &template)? {
            return binding.require("entity");
        }
    }

    tracing::debug!(
        name,
        candidates = candidates.len(),
        "no entity owns this identifier"
    );
    Err(SemnetError::EntityNotFound(name.to_string()))
}

/// Name → node lookups against a knowledge base.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    kb: KnowledgeBase,
}

impl EntityResolver {
    #[must_use]
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Resolve `name` to its owning node.
    pub fn resolve(&self, name: &str) -> Result<Addr, SemnetError> {
        self.kb
            .read(|graph, keynodes| resolve_entity(graph, keynodes, name))
    }
}

// =============================================================================
// TESTS
// =============================================================================
