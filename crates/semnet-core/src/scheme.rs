//! # Process-Scheme Linearizer
//!
//! Walks a process scheme from its unique start node and renders it as a
//! numbered step list.
//!
//! ## Traversal
//!
//! Depth-first with an explicit stack. A node is appended to `order` the
//! first time it is popped and is never expanded again, which handles cycles
//! and converging branches. Successors are two hops away:
//!
//! ```text
//! node ══nrel_incidence══▶ connection ══nrel_incidence══▶ successor
//! ```
//!
//! ## Rendering
//!
//! One line per node in visitation order:
//!
//! ```text
//! 0: start -> 1;
//! 1: choice -> 2, 4;
//! 2: Нарезать лук -> 3;
//! 3: end.
//! ```
//!
//! Role checks run in the order start, choice, unit, allocation, finish and
//! the first matching role labels the node. A node with no role gets an
//! empty label.

use crate::graph::GraphStore;
use crate::keynodes::Keynodes;
use crate::matcher::Matcher;
use crate::primitives::{DEFAULT_LANGUAGE, keynodes};
use crate::template::{Template, Term};
use crate::{Addr, EdgeType, SemnetError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// LABELS
// =============================================================================

/// Fixed labels of the marker roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeLabels {
    pub start: String,
    pub choice: String,
    pub end: String,
}

impl Default for SchemeLabels {
    fn default() -> Self {
        Self {
            start: "start".to_string(),
            choice: "choice".to_string(),
            end: "end".to_string(),
        }
    }
}

impl SchemeLabels {
    /// Russian marker labels.
    #[must_use]
    pub fn russian() -> Self {
        Self {
            start: "Начало".to_string(),
            choice: "Выбор".to_string(),
            end: "Завершение".to_string(),
        }
    }

    /// Labels by short language code (`en`, `ru`).
    #[must_use]
    pub fn for_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::default()),
            "ru" => Some(Self::russian()),
            _ => None,
        }
    }
}

/// Structural role of a scheme node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Start,
    Choice,
    Unit,
    Allocation,
    Finish,
}

impl Role {
    /// Check order; the first match wins.
    const ALL: [(Role, &'static str); 5] = [
        (Role::Start, keynodes::PROCEDURE_STARTING_IMAGE),
        (
            Role::Choice,
            keynodes::STARTING_OF_PARALLEL_SEQUENCE_EXECUTION_IMAGE,
        ),
        (Role::Unit, keynodes::UNIT_PROCEDURE_IMAGE),
        (Role::Allocation, keynodes::ALLOCATION_ELEMENT_IMAGE),
        (Role::Finish, keynodes::PROCEDURE_FINISHING_IMAGE),
    ];
}

// =============================================================================
// LINEARIZATION
// =============================================================================

/// Result of linearizing one scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linearization {
    /// Nodes in visitation order, each exactly once.
    pub order: Vec<Addr>,
    /// Successors of every visited node, in discovery order.
    pub successors: BTreeMap<Addr, Vec<Addr>>,
    /// Newline-joined step lines.
    pub rendered: String,
}

impl Linearization {
    /// Position of `node` in `order`.
    #[must_use]
    pub fn index_of(&self, node: Addr) -> Option<usize> {
        self.order.iter().position(|n| *n == node)
    }
}

/// Linearizes process schemes.
#[derive(Debug, Clone)]
pub struct SchemeLinearizer {
    labels: SchemeLabels,
    language: String,
}

impl Default for SchemeLinearizer {
    fn default() -> Self {
        Self {
            labels: SchemeLabels::default(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl SchemeLinearizer {
    #[must_use]
    pub fn new(labels: SchemeLabels, language: impl Into<String>) -> Self {
        Self {
            labels,
            language: language.into(),
        }
    }

    #[must_use]
    pub fn labels(&self) -> &SchemeLabels {
        &self.labels
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Traverse and render the scheme structure `scheme`.
    pub fn linearize<G: GraphStore>(
        &self,
        graph: &G,
        keynodes: &Keynodes,
        scheme: Addr,
    ) -> Result<Linearization, SemnetError> {
        let start = start_node(graph, keynodes, scheme)?;

        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        let mut successors_of = BTreeMap::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);

            let next = successors(graph, keynodes, node)?;
            tracing::trace!(%node, successors = next.len(), "scheme node expanded");
            stack.extend(next.iter().copied());
            successors_of.insert(node, next);
        }

        let rendered = self.render(graph, keynodes, &order, &successors_of)?;
        tracing::debug!(%scheme, steps = order.len(), "scheme linearized");

        Ok(Linearization {
            order,
            successors: successors_of,
            rendered,
        })
    }

    fn render<G: GraphStore>(
        &self,
        graph: &G,
        keynodes: &Keynodes,
        order: &[Addr],
        successors_of: &BTreeMap<Addr, Vec<Addr>>,
    ) -> Result<String, SemnetError> {
        let position: BTreeMap<Addr, usize> =
            order.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut lines = Vec::with_capacity(order.len());
        for (i, node) in order.iter().enumerate() {
            let label = self.label(graph, keynodes, *node)?;
            let next: Vec<String> = successors_of
                .get(node)
                .into_iter()
                .flatten()
                .filter_map(|s| position.get(s))
                .map(ToString::to_string)
                .collect();

            if next.is_empty() {
                lines.push(format!("{i}: {label}."));
            } else {
                lines.push(format!("{i}: {label} -> {};", next.join(", ")));
            }
        }
        Ok(lines.join("\n"))
    }

    fn label<G: GraphStore>(
        &self,
        graph: &G,
        keynodes: &Keynodes,
        node: Addr,
    ) -> Result<String, SemnetError> {
        let classes = node_classes(graph, node)?;
        for (role, idtf) in Role::ALL {
            let class = keynodes.resolve(graph, idtf)?;
            if !classes.contains(&class) {
                continue;
            }
            return match role {
                Role::Start => Ok(self.labels.start.clone()),
                Role::Choice => Ok(self.labels.choice.clone()),
                Role::Unit | Role::Allocation => {
                    image_sign(graph, keynodes, node, &self.language)
                }
                Role::Finish => Ok(self.labels.end.clone()),
            };
        }
        Ok(String::new())
    }
}

// =============================================================================
// LOOKUPS
// =============================================================================

/// The unique member of `scheme` that is a procedure starting image.
pub fn start_node<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    scheme: Addr,
) -> Result<Addr, SemnetError> {
    let starting = keynodes.resolve(graph, keynodes::PROCEDURE_STARTING_IMAGE)?;
    let template = Template::new()
        .triple(
            scheme,
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            Term::node("start"),
        )
        .triple(starting, Term::edge_var(EdgeType::ACCESS_POS_PERM), "start");

    let found = Matcher::search(graph, &template)?;
    match found.as_slice() {
        [only] => only.require("start"),
        _ => {
            tracing::warn!(%scheme, start_nodes = found.len(), "malformed scheme");
            Err(SemnetError::MalformedScheme {
                start_nodes: found.len(),
            })
        }
    }
}

/// Successors of `node` through an incidence connection.
pub fn successors<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    node: Addr,
) -> Result<Vec<Addr>, SemnetError> {
    let incidence = keynodes.resolve(graph, keynodes::NREL_INCIDENCE)?;
    let template = Template::new()
        .quintuple(
            node,
            Term::edge_var(EdgeType::COMMON),
            Term::node("connection"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            incidence,
        )
        .quintuple(
            "connection",
            Term::edge_var(EdgeType::COMMON),
            Term::node("next"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            incidence,
        );

    Matcher::search(graph, &template)?
        .iter()
        .map(|binding| binding.require("next"))
        .collect()
}

/// Class nodes with a positive access edge to `node`.
pub fn node_classes<G: GraphStore>(graph: &G, node: Addr) -> Result<BTreeSet<Addr>, SemnetError> {
    let template = Template::new().triple(
        Term::class("class"),
        Term::edge_var(EdgeType::ACCESS_POS_PERM),
        node,
    );
    Matcher::search(graph, &template)?
        .iter()
        .map(|binding| binding.require("class"))
        .collect()
}

/// Display text of a step: its `nrel_image_sign` link in `language`.
pub fn image_sign<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    node: Addr,
    language: &str,
) -> Result<String, SemnetError> {
    let not_found = || SemnetError::DescriptionNotFound {
        element: node,
        language: language.to_string(),
    };
    let image_sign = keynodes.resolve(graph, keynodes::NREL_IMAGE_SIGN)?;
    let lang = keynodes.find(graph, language)?.ok_or_else(not_found)?;
    let template = Template::new()
        .quintuple(
            node,
            Term::edge_var(EdgeType::COMMON),
            Term::link("text"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            image_sign,
        )
        .triple(lang, Term::edge_var(EdgeType::ACCESS_POS_PERM), "text");

    let link = Matcher::first(graph, &template)?
        .ok_or_else(not_found)?
        .require("text")?;
    graph
        .link_content(link)?
        .map(|content| content.to_string())
        .ok_or_else(not_found)
}

// =============================================================================
// TESTS
// =============================================================================
