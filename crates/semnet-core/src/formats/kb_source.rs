//! # Knowledge Source
//!
//! JSON seed format for a knowledge base:
//!
//! ```json
//! {
//!   "nodes": [{ "id": "cooking", "kind": "plain", "names": { "lang_ru": "Кулинария" } }],
//!   "links": [{ "id": "soup_text", "text": "Суп", "language": "lang_ru" }],
//!   "arcs":  [{ "type": "common", "source": "cooking", "target": "soups",
//!               "relation": "nrel_inclusion" }]
//! }
//! ```
//!
//! Node ids become system identifiers. Link and arc ids are local to the
//! source and only serve as arc endpoints. An endpoint that is declared
//! nowhere is looked up by system identifier and created on demand
//! (`nrel_*`/`rrel_*` as relations, anything else as a plain node).
//!
//! Loading is additive: applying the same source twice reuses nodes but
//! duplicates links and arcs.

use crate::graph::GraphStore;
use crate::keynodes::Keynodes;
use crate::primitives::keynodes;
use crate::session::KnowledgeBase;
use crate::{Addr, EdgeType, Element, LinkContent, NodeKind, SemnetError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of declarations accepted from one source.
pub const MAX_SOURCE_DECLARATIONS: usize = 1_000_000;

// =============================================================================
// SOURCE FORMAT
// =============================================================================

/// A node with a system identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    pub id: String,
    #[serde(default)]
    pub kind: NodeKind,
    /// Main identifiers by language class (`lang_ru` → text).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub names: BTreeMap<String, String>,
}

/// A text link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub id: String,
    pub text: String,
    /// Language class the link belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Edge type as written in a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    Access,
    AccessTemp,
    AccessNeg,
    Common,
}

impl ArcKind {
    #[must_use]
    pub fn edge_type(self) -> EdgeType {
        match self {
            ArcKind::Access => EdgeType::ACCESS_POS_PERM,
            ArcKind::AccessTemp => EdgeType::ACCESS_POS_TEMP,
            ArcKind::AccessNeg => EdgeType::ACCESS_NEG_PERM,
            ArcKind::Common => EdgeType::COMMON,
        }
    }
}

/// An edge between two named elements, optionally qualified by a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceArc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ArcKind,
    pub source: String,
    pub target: String,
    /// Relation (or role) drawn onto this arc with a positive access edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

/// A parsed knowledge source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    #[serde(default)]
    pub nodes: Vec<SourceNode>,
    #[serde(default)]
    pub links: Vec<SourceLink>,
    #[serde(default)]
    pub arcs: Vec<SourceArc>,
}

/// What one load created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub nodes: usize,
    pub links: usize,
    pub arcs: usize,
}

// =============================================================================
// LOADING
// =============================================================================

impl KnowledgeSource {
    /// Parse a source from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SemnetError> {
        let source: Self = serde_json::from_str(text)
            .map_err(|e| SemnetError::SerializationError(format!("knowledge source: {e}")))?;
        let declared = source.nodes.len() + source.links.len() + source.arcs.len();
        if declared > MAX_SOURCE_DECLARATIONS {
            return Err(SemnetError::SerializationError(format!(
                "knowledge source declares {declared} elements (max {MAX_SOURCE_DECLARATIONS})"
            )));
        }
        Ok(source)
    }

    /// Apply the source to a shared knowledge base in one write.
    pub fn load_into(&self, kb: &KnowledgeBase) -> Result<LoadReport, SemnetError> {
        let report = kb.write(|graph, keynodes| self.apply(graph, keynodes))?;
        tracing::info!(
            nodes = report.nodes,
            links = report.links,
            arcs = report.arcs,
            "knowledge source loaded"
        );
        Ok(report)
    }

    /// Apply the source to `graph`.
    ///
    /// Nodes come first, then links, then arcs in declaration order, so an
    /// arc may use any earlier arc as an endpoint.
    pub fn apply<G: GraphStore>(
        &self,
        graph: &mut G,
        keynodes: &Keynodes,
    ) -> Result<LoadReport, SemnetError> {
        let mut scope = Scope::default();
        let mut report = LoadReport::default();

        for node in &self.nodes {
            let (addr, created) = declare_node(graph, &node.id, node.kind)?;
            report.nodes += usize::from(created);
            for (language, text) in &node.names {
                name_node(graph, keynodes, &scope, addr, language, text)?;
                report.links += 1;
            }
        }

        for link in &self.links {
            if scope.local.contains_key(&link.id) {
                return Err(SemnetError::DuplicateIdentifier(link.id.clone()));
            }
            let addr = graph.create_link(LinkContent::text(link.text.as_str()))?;
            if let Some(language) = &link.language {
                let lang = scope.endpoint(graph, language, NodeKind::Class)?;
                graph.create_edge(EdgeType::ACCESS_POS_PERM, lang, addr)?;
            }
            scope.local.insert(link.id.clone(), addr);
            report.links += 1;
        }

        for arc in &self.arcs {
            let source = scope.endpoint(graph, &arc.source, NodeKind::Plain)?;
            let target = scope.endpoint(graph, &arc.target, NodeKind::Plain)?;
            let edge = graph.create_edge(arc.kind.edge_type(), source, target)?;
            if let Some(relation) = &arc.relation {
                let relation = scope.endpoint(graph, relation, NodeKind::Relation)?;
                graph.create_edge(EdgeType::ACCESS_POS_PERM, relation, edge)?;
            }
            if let Some(id) = &arc.id {
                if scope.local.insert(id.clone(), edge).is_some() {
                    return Err(SemnetError::DuplicateIdentifier(id.clone()));
                }
            }
            report.arcs += 1;
        }

        Ok(report)
    }
}

/// Attach a main identifier link in `language` to `node`.
fn name_node<G: GraphStore>(
    graph: &mut G,
    keynodes: &Keynodes,
    scope: &Scope,
    node: Addr,
    language: &str,
    text: &str,
) -> Result<(), SemnetError> {
    let main_idtf = keynodes.resolve(graph, keynodes::NREL_MAIN_IDTF)?;
    let lang = scope.endpoint(graph, language, NodeKind::Class)?;
    let link = graph.create_link(LinkContent::text(text))?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, lang, link)?;
    let pair = graph.create_edge(EdgeType::COMMON, node, link)?;
    graph.create_edge(EdgeType::ACCESS_POS_PERM, main_idtf, pair)?;
    Ok(())
}

/// Find or create the node with system identifier `id`.
///
/// An existing element must be a node of the declared kind.
fn declare_node<G: GraphStore>(
    graph: &mut G,
    id: &str,
    kind: NodeKind,
) -> Result<(Addr, bool), SemnetError> {
    if let Some(addr) = graph.find_by_system_idtf(id)? {
        return match graph.element(addr)? {
            Some(Element::Node(existing)) if existing == kind => Ok((addr, false)),
            Some(other) => Err(SemnetError::TypeMismatch(format!(
                "{id} is already a {} ({other:?}), declared as {kind:?}",
                other.kind_name()
            ))),
            None => Err(SemnetError::InvalidReference(addr)),
        };
    }
    let addr = graph.create_node(kind)?;
    graph.set_system_idtf(addr, id)?;
    Ok((addr, true))
}

/// Names visible while applying one source.
#[derive(Default)]
struct Scope {
    /// Link and arc ids.
    local: BTreeMap<String, Addr>,
}

impl Scope {
    /// Resolve an arc endpoint, creating an undeclared node on demand.
    fn endpoint<G: GraphStore>(
        &self,
        graph: &mut G,
        name: &str,
        fallback: NodeKind,
    ) -> Result<Addr, SemnetError> {
        if let Some(addr) = self.local.get(name) {
            return Ok(*addr);
        }
        if let Some(addr) = graph.find_by_system_idtf(name)? {
            return Ok(addr);
        }
        let kind = if name.starts_with("nrel_") || name.starts_with("rrel_") {
            NodeKind::Relation
        } else {
            fallback
        };
        let addr = graph.create_node(kind)?;
        graph.set_system_idtf(addr, name)?;
        tracing::trace!(name, ?kind, "created undeclared node");
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_entity;

    const COOKING: &str = r#"{
        "nodes": [
            { "id": "cooking", "names": { "lang_ru": "Кулинария", "lang_en": "Cooking" } },
            { "id": "soups", "names": { "lang_ru": "Супы" } },
            { "id": "dish", "kind": "class" }
        ],
        "links": [
            { "id": "note", "text": "заметка", "language": "lang_ru" }
        ],
        "arcs": [
            { "id": "incl", "type": "common", "source": "cooking", "target": "soups",
              "relation": "nrel_inclusion" },
            { "type": "access", "source": "dish", "target": "soups" },
            { "type": "access", "source": "rrel_note_of", "target": "incl" }
        ]
    }"#;

    fn loaded() -> KnowledgeBase {
        let kb = KnowledgeBase::empty().expect("kb");
        KnowledgeSource::from_json(COOKING)
            .expect("parse")
            .load_into(&kb)
            .expect("load");
        kb
    }

    #[test]
    fn names_become_main_identifiers() {
        let kb = loaded();
        let by_ru = kb
            .read(|g, k| resolve_entity(g, k, "Кулинария"))
            .expect("ru");
        let by_en = kb.read(|g, k| resolve_entity(g, k, "Cooking")).expect("en");
        assert_eq!(by_ru, by_en);
        assert_eq!(kb.keynode("cooking").expect("idtf"), by_ru);
    }

    #[test]
    fn report_counts_declarations() {
        let kb = KnowledgeBase::empty().expect("kb");
        let report = KnowledgeSource::from_json(COOKING)
            .expect("parse")
            .load_into(&kb)
            .expect("load");
        assert_eq!(
            report,
            LoadReport {
                nodes: 3,
                links: 4,
                arcs: 3
            }
        );
    }

    #[test]
    fn relation_qualifies_the_arc() {
        let kb = loaded();
        kb.read(|g, k| {
            let inclusion = k.resolve(g, keynodes::NREL_INCLUSION)?;
            let cooking = k.resolve(g, "cooking")?;
            let soups = k.resolve(g, "soups")?;
            let qualified = g.outgoing(inclusion)?;
            assert_eq!(qualified.len(), 1);
            let pair = g.element(qualified[0])?.and_then(|e| e.as_edge()).map(|e| e.2);
            let pair = pair.expect("qualified edge");
            assert_eq!(
                g.element(pair)?.and_then(|e| e.as_edge()),
                Some((EdgeType::COMMON, cooking, soups))
            );
            Ok(())
        })
        .expect("read");
    }

    #[test]
    fn undeclared_endpoints_are_created_by_prefix() {
        let kb = loaded();
        kb.read(|g, _| {
            let role = g.find_by_system_idtf("rrel_note_of")?.expect("created");
            assert_eq!(g.element(role)?, Some(Element::Node(NodeKind::Relation)));
            Ok(())
        })
        .expect("read");
    }

    #[test]
    fn link_language_is_membership() {
        let kb = loaded();
        kb.read(|g, k| {
            let ru = k.resolve(g, keynodes::LANG_RU)?;
            let note = g.search_links_by_content("заметка")?;
            assert_eq!(note.len(), 1);
            let from_ru = g
                .incoming(note[0])?
                .into_iter()
                .filter_map(|e| g.get(e).and_then(Element::as_edge))
                .any(|(_, source, _)| source == ru);
            assert!(from_ru);
            Ok(())
        })
        .expect("read");
    }

    #[test]
    fn conflicting_kind_is_rejected() {
        let kb = KnowledgeBase::empty().expect("kb");
        let source = KnowledgeSource::from_json(
            r#"{ "nodes": [{ "id": "nrel_inclusion", "kind": "class" }] }"#,
        )
        .expect("parse");
        assert!(matches!(
            source.load_into(&kb),
            Err(SemnetError::TypeMismatch(_))
        ));
    }

    #[test]
    fn duplicate_local_id_is_rejected() {
        let source = KnowledgeSource::from_json(
            r#"{ "links": [
                { "id": "a", "text": "one" },
                { "id": "a", "text": "two" }
            ] }"#,
        )
        .expect("parse");
        assert!(matches!(
            source.load_into(&KnowledgeBase::empty().expect("kb")),
            Err(SemnetError::DuplicateIdentifier(id)) if id == "a"
        ));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            KnowledgeSource::from_json("{ nodes: [] }"),
            Err(SemnetError::SerializationError(_))
        ));
    }
}
