//! # Result Collections
//!
//! A `Collection` is a set node plus one membership edge per member.
//!
//! - Unordered collections (sets) hold each member once
//! - Ordered collections (structures) tag membership edge `i` with the
//!   ordinal relation `rrel_<i>` (1-based) and may repeat members
//! - Collections are write-once: `from_members` materializes the whole
//!   substructure and nothing here mutates it afterwards

use crate::graph::GraphStore;
use crate::keynodes::Keynodes;
use crate::primitives::parse_ordinal;
use crate::{Addr, EdgeType, NodeKind, SemnetError};
use std::collections::BTreeSet;

/// A materialized group of elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    node: Addr,
    ordered: bool,
    members: Vec<Addr>,
}

impl Collection {
    /// Materialize `members` under a fresh structure node.
    pub fn from_members<G: GraphStore>(
        graph: &mut G,
        keynodes: &Keynodes,
        members: &[Addr],
        ordered: bool,
    ) -> Result<Self, SemnetError> {
        let members: Vec<Addr> = if ordered {
            members.to_vec()
        } else {
            let mut seen = BTreeSet::new();
            members.iter().copied().filter(|m| seen.insert(*m)).collect()
        };

        let node = graph.create_node(NodeKind::Structure)?;
        for (i, member) in members.iter().enumerate() {
            let membership = graph.create_edge(EdgeType::ACCESS_POS_PERM, node, *member)?;
            if ordered {
                let ordinal = keynodes.ordinal_or_create(graph, i + 1)?;
                graph.create_edge(EdgeType::ACCESS_POS_PERM, ordinal, membership)?;
            }
        }

        Ok(Self {
            node,
            ordered,
            members,
        })
    }

    /// Read the collection rooted at `node`.
    ///
    /// When `ordered`, members are sorted by their ordinal tag; untagged
    /// members follow in edge order.
    pub fn load<G: GraphStore>(graph: &G, node: Addr, ordered: bool) -> Result<Self, SemnetError> {
        if !graph.contains(node)? {
            return Err(SemnetError::InvalidReference(node));
        }

        let mut tagged: Vec<(usize, Addr)> = Vec::new();
        let mut untagged: Vec<Addr> = Vec::new();
        for edge in graph.outgoing(node)? {
            let Some(element) = graph.element(edge)? else {
                continue;
            };
            let Some((ty, _, target)) = element.as_edge() else {
                continue;
            };
            if ty != EdgeType::ACCESS_POS_PERM {
                continue;
            }
            let ordinal = if ordered {
                Self::ordinal_of(graph, edge)?
            } else {
                None
            };
            match ordinal {
                Some(index) => tagged.push((index, target)),
                None => untagged.push(target),
            }
        }

        tagged.sort_by_key(|(index, _)| *index);
        let members = tagged
            .into_iter()
            .map(|(_, member)| member)
            .chain(untagged)
            .collect();

        Ok(Self {
            node,
            ordered,
            members,
        })
    }

    fn ordinal_of<G: GraphStore>(graph: &G, membership: Addr) -> Result<Option<usize>, SemnetError> {
        for edge in graph.incoming(membership)? {
            let Some((ty, source, _)) = graph.element(edge)?.and_then(|e| e.as_edge()) else {
                continue;
            };
            if ty != EdgeType::ACCESS_POS_PERM {
                continue;
            }
            if let Some(index) = graph
                .system_idtf(source)?
                .as_deref()
                .and_then(parse_ordinal)
            {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// The set node.
    #[must_use]
    pub fn node(&self) -> Addr {
        self.node
    }

    /// Whether members carry ordinal tags.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Members in collection order.
    #[must_use]
    pub fn members(&self) -> &[Addr] {
        &self.members
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, addr: Addr) -> bool {
        self.members.contains(&addr)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the collection has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate members in collection order.
    pub fn iter(&self) -> impl Iterator<Item = Addr> + '_ {
        self.members.iter().copied()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Addr;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Addr>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter().copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================
