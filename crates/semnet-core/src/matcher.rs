//! # Template Matcher
//!
//! Evaluates a `Template` against a `GraphStore` and returns every
//! consistent assignment of its named variables.
//!
//! - Read-only: matching never mutates the store
//! - Left to right: clauses are joined in template order over a live set of
//!   partial assignments (initially one empty assignment)
//! - Unification: a variable bound by an earlier slot filters every later slot
//!   that reuses it instead of enumerating
//! - An empty result is a valid answer, never an error

use crate::graph::GraphStore;
use crate::primitives::MAX_TEMPLATE_CLAUSES;
use crate::template::{Binding, Clause, Template, Term, VarType};
use crate::{Addr, Element, SemnetError};
use std::collections::BTreeMap;

/// A compiled slot: either a concrete element or a variable index.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Fixed(Addr),
    Var(usize),
}

#[derive(Debug)]
struct VarDecl {
    name: Option<String>,
    ty: VarType,
}

/// Validated template: variables numbered in declaration order and every
/// clause lowered to one or two `[source, edge, target]` triples.
#[derive(Debug)]
struct Plan {
    vars: Vec<VarDecl>,
    triples: Vec<[Slot; 3]>,
}

type Assignment = Vec<Option<Addr>>;

/// The Matcher runs template searches.
pub struct Matcher;

impl Matcher {
    /// Find all bindings of `template` in `graph`.
    ///
    /// Results are enumerated in ascending address order, so repeated calls
    /// against an unchanged graph return the same sequence.
    pub fn search<G: GraphStore>(
        graph: &G,
        template: &Template,
    ) -> Result<Vec<Binding>, SemnetError> {
        let plan = Self::compile(graph, template)?;

        let mut live: Vec<Assignment> = vec![vec![None; plan.vars.len()]];
        for triple in &plan.triples {
            let mut next = Vec::new();
            for assignment in &live {
                Self::extend(graph, &plan, triple, assignment, &mut next)?;
            }
            live = next;
            if live.is_empty() {
                break;
            }
        }

        tracing::trace!(
            clauses = template.len(),
            bindings = live.len(),
            "template search finished"
        );

        Ok(live
            .into_iter()
            .map(|assignment| Self::project(&plan, &assignment))
            .collect())
    }

    /// Return the first binding, if any.
    pub fn first<G: GraphStore>(
        graph: &G,
        template: &Template,
    ) -> Result<Option<Binding>, SemnetError> {
        Ok(Self::search(graph, template)?.into_iter().next())
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    fn compile<G: GraphStore>(graph: &G, template: &Template) -> Result<Plan, SemnetError> {
        if template.is_empty() {
            return Err(SemnetError::InvalidTemplate(
                "template has no clauses".to_string(),
            ));
        }
        if template.len() > MAX_TEMPLATE_CLAUSES {
            return Err(SemnetError::InvalidTemplate(format!(
                "{} clauses exceeds maximum {}",
                template.len(),
                MAX_TEMPLATE_CLAUSES
            )));
        }

        let mut compiler = Compiler {
            vars: Vec::new(),
            names: BTreeMap::new(),
        };
        let mut triples = Vec::with_capacity(template.len());

        for clause in template.clauses() {
            match clause {
                Clause::Triple {
                    source,
                    edge,
                    target,
                } => {
                    let s = compiler.slot(graph, source, false)?;
                    let e = compiler.slot(graph, edge, true)?;
                    let t = compiler.slot(graph, target, false)?;
                    triples.push([s, e, t]);
                }
                Clause::Quintuple {
                    source,
                    edge,
                    target,
                    attr_edge,
                    relation,
                } => {
                    let s = compiler.slot(graph, source, false)?;
                    let e = compiler.slot(graph, edge, true)?;
                    let t = compiler.slot(graph, target, false)?;
                    let ae = compiler.slot(graph, attr_edge, true)?;
                    let r = compiler.slot(graph, relation, false)?;
                    triples.push([s, e, t]);
                    triples.push([r, ae, e]);
                }
            }
        }

        Ok(Plan {
            vars: compiler.vars,
            triples,
        })
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    fn extend<G: GraphStore>(
        graph: &G,
        plan: &Plan,
        triple: &[Slot; 3],
        assignment: &Assignment,
        out: &mut Vec<Assignment>,
    ) -> Result<(), SemnetError> {
        let value = |slot: Slot| match slot {
            Slot::Fixed(addr) => Some(addr),
            Slot::Var(i) => assignment[i],
        };
        let [source_slot, edge_slot, target_slot] = *triple;

        // Most constrained access path first.
        let candidates = if let Some(edge) = value(edge_slot) {
            vec![edge]
        } else if let (Some(source), Some(target)) = (value(source_slot), value(target_slot)) {
            let outgoing = graph.outgoing(source)?;
            let incoming = graph.incoming(target)?;
            if outgoing.len() <= incoming.len() {
                outgoing
            } else {
                incoming
            }
        } else if let Some(source) = value(source_slot) {
            graph.outgoing(source)?
        } else if let Some(target) = value(target_slot) {
            graph.incoming(target)?
        } else {
            let ty = match edge_slot {
                Slot::Var(i) => plan.vars[i].ty.edge_type(),
                Slot::Fixed(_) => None,
            };
            graph.edges_of_type(ty)?
        };

        for edge in candidates {
            let Some(element) = graph.element(edge)? else {
                continue;
            };
            let Some((_, source, target)) = element.as_edge() else {
                continue;
            };

            let mut extended = assignment.clone();
            if Self::bind(graph, plan, &mut extended, edge_slot, edge, Some(&element))?
                && Self::bind(graph, plan, &mut extended, source_slot, source, None)?
                && Self::bind(graph, plan, &mut extended, target_slot, target, None)?
            {
                out.push(extended);
            }
        }
        Ok(())
    }

    /// Bind or check one slot against a candidate element.
    fn bind<G: GraphStore>(
        graph: &G,
        plan: &Plan,
        assignment: &mut Assignment,
        slot: Slot,
        addr: Addr,
        known: Option<&Element>,
    ) -> Result<bool, SemnetError> {
        match slot {
            Slot::Fixed(fixed) => Ok(fixed == addr),
            Slot::Var(i) => {
                if let Some(bound) = assignment[i] {
                    return Ok(bound == addr);
                }
                let accepted = match known {
                    Some(element) => plan.vars[i].ty.accepts(element),
                    None => graph
                        .element(addr)?
                        .is_some_and(|element| plan.vars[i].ty.accepts(&element)),
                };
                if accepted {
                    assignment[i] = Some(addr);
                }
                Ok(accepted)
            }
        }
    }

    fn project(plan: &Plan, assignment: &Assignment) -> Binding {
        let mut binding = Binding::default();
        for (decl, value) in plan.vars.iter().zip(assignment) {
            if let (Some(name), Some(addr)) = (&decl.name, value) {
                binding.insert(name.clone(), *addr);
            }
        }
        binding
    }
}

/// Slot compiler state: declared variables and their names.
struct Compiler {
    vars: Vec<VarDecl>,
    names: BTreeMap<String, usize>,
}

impl Compiler {
    fn slot<G: GraphStore>(
        &mut self,
        graph: &G,
        term: &Term,
        edge_position: bool,
    ) -> Result<Slot, SemnetError> {
        match term {
            Term::Fixed(addr) => {
                let element = graph
                    .element(*addr)?
                    .ok_or(SemnetError::InvalidReference(*addr))?;
                if edge_position && !element.is_edge() {
                    return Err(SemnetError::TypeMismatch(format!(
                        "{addr} is a {} in an edge slot",
                        element.kind_name()
                    )));
                }
                Ok(Slot::Fixed(*addr))
            }
            Term::Var { name, ty } => {
                if edge_position && !ty.is_edge() {
                    return Err(SemnetError::TypeMismatch(format!(
                        "variable {} in an edge slot must have an edge type",
                        name.as_deref().unwrap_or("_")
                    )));
                }
                if let Some(name) = name {
                    if let Some(&index) = self.names.get(name) {
                        if self.vars[index].ty != *ty {
                            return Err(SemnetError::TypeMismatch(format!(
                                "variable {name} redeclared as {ty:?}, was {:?}",
                                self.vars[index].ty
                            )));
                        }
                        return Ok(Slot::Var(index));
                    }
                    self.names.insert(name.clone(), self.vars.len());
                }
                self.vars.push(VarDecl {
                    name: name.clone(),
                    ty: *ty,
                });
                Ok(Slot::Var(self.vars.len() - 1))
            }
            Term::Ref(name) => {
                let index = *self
                    .names
                    .get(name)
                    .ok_or_else(|| SemnetError::UnknownVariable(name.clone()))?;
                if edge_position && !self.vars[index].ty.is_edge() {
                    return Err(SemnetError::TypeMismatch(format!(
                        "variable {name} is not an edge but is used in an edge slot"
                    )));
                }
                Ok(Slot::Var(index))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
