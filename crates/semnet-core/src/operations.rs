//! # Search Operations
//!
//! The standard operations registered with the dispatcher. Each one is a
//! thin instance of the matcher: one template around one relation.
//!
//! | operation | argument | result |
//! |---|---|---|
//! | `action_find_info` | entity | main identifier link in the configured language |
//! | `action_find_description` | entity | example text of its key-element translation |
//! | `action_find_key_sc_element` | entity | `rrel_key_sc_element` members |
//! | `action_find_max_class` | entity | `rrel_maximum_studied_object_class` members |
//! | `action_find_not_max_class` | entity | `rrel_not_maximum_studied_object_class` members |
//! | `action_find_in_decompositions` | section | sections of its decomposition tuple |
//! | `action_find_parent_decomposition` | section | sections whose decomposition holds it |
//! | `action_find_included_children` | entity | `nrel_inclusion` targets |
//! | `action_find_included_in_parents` | entity | `nrel_inclusion` sources |
//! | `action_find_stages_list` | scheme | text link with the rendered scheme |
//!
//! Every operation except `action_find_in_decompositions` finishes
//! unsuccessfully when it finds nothing.

use crate::action::ActionContext;
use crate::dispatcher::{Operation, OperationRegistry};
use crate::graph::GraphStore;
use crate::keynodes::Keynodes;
use crate::matcher::Matcher;
use crate::primitives::{DEFAULT_LANGUAGE, keynodes, operations};
use crate::scheme::{SchemeLabels, SchemeLinearizer};
use crate::template::{Template, Term};
use crate::{Addr, EdgeType, LinkContent, SemnetError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Settings shared by the standard operations.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// System identifier of the language class for display texts.
    pub language: String,
    /// Marker labels for rendered schemes.
    pub labels: SchemeLabels,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            labels: SchemeLabels::default(),
        }
    }
}

/// The standard searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Search {
    Info,
    Description,
    KeyScElement,
    MaxClass,
    NotMaxClass,
    InDecompositions,
    ParentDecomposition,
    IncludedChildren,
    IncludedInParents,
    StagesList,
}

impl Search {
    pub const ALL: [Search; 10] = [
        Search::Info,
        Search::Description,
        Search::KeyScElement,
        Search::MaxClass,
        Search::NotMaxClass,
        Search::InDecompositions,
        Search::ParentDecomposition,
        Search::IncludedChildren,
        Search::IncludedInParents,
        Search::StagesList,
    ];

    /// Operation identifier.
    #[must_use]
    pub fn identifier(self) -> &'static str {
        match self {
            Search::Info => operations::FIND_INFO,
            Search::Description => operations::FIND_DESCRIPTION,
            Search::KeyScElement => operations::FIND_KEY_SC_ELEMENT,
            Search::MaxClass => operations::FIND_MAX_CLASS,
            Search::NotMaxClass => operations::FIND_NOT_MAX_CLASS,
            Search::InDecompositions => operations::FIND_IN_DECOMPOSITIONS,
            Search::ParentDecomposition => operations::FIND_PARENT_DECOMPOSITION,
            Search::IncludedChildren => operations::FIND_INCLUDED_CHILDREN,
            Search::IncludedInParents => operations::FIND_INCLUDED_IN_PARENTS,
            Search::StagesList => operations::FIND_STAGES_LIST,
        }
    }
}

/// One standard search bound to shared settings.
#[derive(Debug, Clone)]
pub struct SearchOperation {
    search: Search,
    settings: Arc<SearchSettings>,
}

impl SearchOperation {
    #[must_use]
    pub fn new(search: Search, settings: Arc<SearchSettings>) -> Self {
        Self { search, settings }
    }
}

impl Operation for SearchOperation {
    fn identifier(&self) -> &str {
        self.search.identifier()
    }

    fn run(&self, ctx: &ActionContext) -> Result<Vec<Addr>, SemnetError> {
        let arg = ctx.argument(1)?;
        let language = self.settings.language.as_str();

        if self.search == Search::StagesList {
            let linearizer = SchemeLinearizer::new(self.settings.labels.clone(), language);
            let lin = ctx
                .kb()
                .read(|graph, keynodes| linearizer.linearize(graph, keynodes, arg))?;
            let link = ctx
                .kb()
                .write(|graph, _| graph.create_link(LinkContent::text(lin.rendered)))?;
            return Ok(vec![link]);
        }

        let found = ctx.kb().read(|graph, keynodes| match self.search {
            Search::Info => Ok(find_info(graph, keynodes, arg, language)?.into_iter().collect()),
            Search::Description => {
                Ok(find_description(graph, keynodes, arg, language)?.into_iter().collect())
            }
            Search::KeyScElement => {
                role_members(graph, keynodes, arg, keynodes::RREL_KEY_SC_ELEMENT)
            }
            Search::MaxClass => {
                role_members(graph, keynodes, arg, keynodes::RREL_MAXIMUM_STUDIED_OBJECT_CLASS)
            }
            Search::NotMaxClass => role_members(
                graph,
                keynodes,
                arg,
                keynodes::RREL_NOT_MAXIMUM_STUDIED_OBJECT_CLASS,
            ),
            Search::InDecompositions => in_decompositions(graph, keynodes, arg),
            Search::ParentDecomposition => parent_decomposition(graph, keynodes, arg),
            Search::IncludedChildren => {
                related(graph, keynodes, arg, keynodes::NREL_INCLUSION, Direction::Outgoing)
            }
            Search::IncludedInParents => {
                related(graph, keynodes, arg, keynodes::NREL_INCLUSION, Direction::Incoming)
            }
            Search::StagesList => Ok(Vec::new()),
        })?;

        if found.is_empty() && self.search != Search::InDecompositions {
            return Err(SemnetError::NoResult(format!(
                "{} found nothing for {arg}",
                self.search.identifier()
            )));
        }
        tracing::debug!(operation = self.search.identifier(), %arg, found = found.len(), "search finished");
        Ok(found)
    }
}

impl OperationRegistry {
    /// Registry holding every standard search.
    pub fn standard(settings: SearchSettings) -> Result<Self, SemnetError> {
        let settings = Arc::new(settings);
        let mut registry = Self::new();
        for search in Search::ALL {
            registry.register(SearchOperation::new(search, Arc::clone(&settings)))?;
        }
        Ok(registry)
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Side of a common edge the argument sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `arg ══relation══▶ result`
    Outgoing,
    /// `result ══relation══▶ arg`
    Incoming,
}

/// Main identifier link of `entity` in `language`.
pub fn find_info<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    entity: Addr,
    language: &str,
) -> Result<Option<Addr>, SemnetError> {
    let main_idtf = keynodes.resolve(graph, keynodes::NREL_MAIN_IDTF)?;
    let Some(lang) = keynodes.find(graph, language)? else {
        return Ok(None);
    };
    let template = Template::new()
        .quintuple(
            entity,
            Term::edge_var(EdgeType::COMMON),
            Term::link("idtf"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            main_idtf,
        )
        .triple(lang, Term::edge_var(EdgeType::ACCESS_POS_PERM), "idtf");
    Matcher::first(graph, &template)?
        .map(|b| b.require("idtf"))
        .transpose()
}

/// Example text of the translation whose key element is `entity`.
pub fn find_description<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    entity: Addr,
    language: &str,
) -> Result<Option<Addr>, SemnetError> {
    let key_element = keynodes.resolve(graph, keynodes::RREL_KEY_SC_ELEMENT)?;
    let translation = keynodes.resolve(graph, keynodes::NREL_SC_TEXT_TRANSLATION)?;
    let example = keynodes.resolve(graph, keynodes::RREL_EXAMPLE)?;
    let Some(lang) = keynodes.find(graph, language)? else {
        return Ok(None);
    };

    let template = Template::new()
        .quintuple(
            Term::node("article"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            entity,
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            key_element,
        )
        .quintuple(
            Term::node("translation"),
            Term::edge_var(EdgeType::COMMON),
            "article",
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            translation,
        )
        .quintuple(
            "translation",
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            Term::link("text"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            example,
        )
        .triple(lang, Term::edge_var(EdgeType::ACCESS_POS_PERM), "text");
    Matcher::first(graph, &template)?
        .map(|b| b.require("text"))
        .transpose()
}

/// Members of `entity` whose access edge carries the role `role`.
pub fn role_members<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    entity: Addr,
    role: &str,
) -> Result<Vec<Addr>, SemnetError> {
    let role = keynodes.resolve(graph, role)?;
    let template = Template::new().quintuple(
        entity,
        Term::edge_var(EdgeType::ACCESS_POS_PERM),
        Term::node("member"),
        Term::edge_var(EdgeType::ACCESS_POS_PERM),
        role,
    );
    collect(graph, &template, "member")
}

/// Elements linked to `entity` by a common edge under `relation`.
pub fn related<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    entity: Addr,
    relation: &str,
    direction: Direction,
) -> Result<Vec<Addr>, SemnetError> {
    let relation = keynodes.resolve(graph, relation)?;
    let (source, target) = match direction {
        Direction::Outgoing => (Term::Fixed(entity), Term::node("other")),
        Direction::Incoming => (Term::node("other"), Term::Fixed(entity)),
    };
    let template = Template::new().quintuple(
        source,
        Term::edge_var(EdgeType::COMMON),
        target,
        Term::edge_var(EdgeType::ACCESS_POS_PERM),
        relation,
    );
    collect(graph, &template, "other")
}

/// Sections in the decomposition tuple of `section`.
pub fn in_decompositions<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    section: Addr,
) -> Result<Vec<Addr>, SemnetError> {
    let decomposition = keynodes.resolve(graph, keynodes::NREL_SECTION_DECOMPOSITION)?;
    let template = Template::new()
        .quintuple(
            Term::node("tuple"),
            Term::edge_var(EdgeType::COMMON),
            section,
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            decomposition,
        )
        .triple(
            "tuple",
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            Term::node("part"),
        );
    collect(graph, &template, "part")
}

/// Sections whose decomposition tuple contains `section`.
pub fn parent_decomposition<G: GraphStore>(
    graph: &G,
    keynodes: &Keynodes,
    section: Addr,
) -> Result<Vec<Addr>, SemnetError> {
    let decomposition = keynodes.resolve(graph, keynodes::NREL_SECTION_DECOMPOSITION)?;
    let template = Template::new()
        .triple(
            Term::node("tuple"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            section,
        )
        .quintuple(
            "tuple",
            Term::edge_var(EdgeType::COMMON),
            Term::node("parent"),
            Term::edge_var(EdgeType::ACCESS_POS_PERM),
            decomposition,
        );
    collect(graph, &template, "parent")
}

/// Distinct values of `var` across all bindings, in first-seen order.
fn collect<G: GraphStore>(graph: &G, template: &Template, var: &str) -> Result<Vec<Addr>, SemnetError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for binding in Matcher::search(graph, template)? {
        let addr = binding.require(var)?;
        if seen.insert(addr) {
            out.push(addr);
        }
    }
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionStatus;
    use crate::dispatcher::Dispatcher;
    use crate::graph::Graph;
    use crate::session::KnowledgeBase;
    use crate::NodeKind;

    /// Small cooking taxonomy with identifiers, roles and a decomposition.
    struct Kb {
        kb: KnowledgeBase,
        cooking: Addr,
        soups: Addr,
        salads: Addr,
        borscht: Addr,
        dish: Addr,
    }

    fn kb() -> Kb {
        let kb = KnowledgeBase::empty().expect("kb");
        let (cooking, soups, salads, borscht, dish) = kb
            .write(|g, k| {
                let named = |g: &mut Graph, k: &Keynodes, text: &str| -> Result<Addr, SemnetError> {
                    let main = k.resolve(g, keynodes::NREL_MAIN_IDTF)?;
                    let ru = k.resolve(g, keynodes::LANG_RU)?;
                    let node = g.create_node(NodeKind::Plain)?;
                    let link = g.create_link(LinkContent::text(text))?;
                    let pair = g.create_edge(EdgeType::COMMON, node, link)?;
                    g.create_edge(EdgeType::ACCESS_POS_PERM, main, pair)?;
                    g.create_edge(EdgeType::ACCESS_POS_PERM, ru, link)?;
                    Ok(node)
                };
                let cooking = named(g, k, "Кулинария")?;
                let soups = named(g, k, "Супы")?;
                let salads = named(g, k, "Салаты")?;
                let borscht = named(g, k, "Борщ")?;
                let dish = named(g, k, "блюдо")?;

                // cooking decomposes into soups and salads
                let decomposition = k.resolve(g, keynodes::NREL_SECTION_DECOMPOSITION)?;
                let tuple = g.create_node(NodeKind::Tuple)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, tuple, soups)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, tuple, salads)?;
                let pair = g.create_edge(EdgeType::COMMON, tuple, cooking)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, decomposition, pair)?;

                // soups include borscht
                let inclusion = k.resolve(g, keynodes::NREL_INCLUSION)?;
                let pair = g.create_edge(EdgeType::COMMON, soups, borscht)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, inclusion, pair)?;

                // soups studies dish as its maximum class
                let max = k.resolve(g, keynodes::RREL_MAXIMUM_STUDIED_OBJECT_CLASS)?;
                let member = g.create_edge(EdgeType::ACCESS_POS_PERM, soups, dish)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, max, member)?;

                Ok((cooking, soups, salads, borscht, dish))
            })
            .expect("seed");
        Kb {
            kb,
            cooking,
            soups,
            salads,
            borscht,
            dish,
        }
    }

    fn dispatcher(kb: &KnowledgeBase) -> Dispatcher {
        let registry = OperationRegistry::standard(SearchSettings::default()).expect("registry");
        Dispatcher::new(kb.clone(), registry)
    }

    #[test]
    fn standard_registry_has_every_search() {
        let registry = OperationRegistry::standard(SearchSettings::default()).expect("registry");
        assert_eq!(registry.len(), Search::ALL.len());
        assert!(registry.get(operations::FIND_STAGES_LIST).is_some());
    }

    #[test]
    fn info_returns_main_identifier_text() {
        let f = kb();
        let d = dispatcher(&f.kb);
        let items = d
            .invoke_members(operations::FIND_INFO, &[f.soups])
            .expect("info");
        assert_eq!(items.len(), 1);
        assert_eq!(f.kb.link_text(items[0]).expect("text").as_deref(), Some("Супы"));
    }

    #[test]
    fn info_in_missing_language_fails() {
        let f = kb();
        let settings = SearchSettings {
            language: keynodes::LANG_EN.to_string(),
            ..SearchSettings::default()
        };
        let registry = OperationRegistry::standard(settings).expect("registry");
        let d = Dispatcher::new(f.kb.clone(), registry);
        assert!(matches!(
            d.invoke(operations::FIND_INFO, &[f.soups]),
            Err(SemnetError::OperationFailed { .. })
        ));
    }

    #[test]
    fn info_in_unknown_language_fails_the_action() {
        let f = kb();
        let settings = SearchSettings {
            language: "lang_de".to_string(),
            ..SearchSettings::default()
        };
        let registry = OperationRegistry::standard(settings).expect("registry");
        let d = Dispatcher::new(f.kb.clone(), registry);

        let outcome = d.execute(operations::FIND_INFO, &[f.soups]).expect("execute");
        assert_eq!(outcome.status, ActionStatus::Failed);
        assert!(d.invoke(operations::FIND_DESCRIPTION, &[f.borscht]).is_err());
        assert!(f.kb.keynode("lang_de").is_err());
    }

    #[test]
    fn decomposition_both_ways() {
        let f = kb();
        let d = dispatcher(&f.kb);
        assert_eq!(
            d.invoke_members(operations::FIND_IN_DECOMPOSITIONS, &[f.cooking])
                .expect("parts"),
            vec![f.soups, f.salads]
        );
        assert_eq!(
            d.invoke_members(operations::FIND_PARENT_DECOMPOSITION, &[f.salads])
                .expect("parent"),
            vec![f.cooking]
        );
    }

    #[test]
    fn empty_decomposition_still_succeeds() {
        let f = kb();
        let d = dispatcher(&f.kb);
        assert!(d
            .invoke_members(operations::FIND_IN_DECOMPOSITIONS, &[f.borscht])
            .expect("parts")
            .is_empty());
    }

    #[test]
    fn inclusion_both_ways() {
        let f = kb();
        let d = dispatcher(&f.kb);
        assert_eq!(
            d.invoke_members(operations::FIND_INCLUDED_CHILDREN, &[f.soups])
                .expect("children"),
            vec![f.borscht]
        );
        assert_eq!(
            d.invoke_members(operations::FIND_INCLUDED_IN_PARENTS, &[f.borscht])
                .expect("parents"),
            vec![f.soups]
        );
    }

    #[test]
    fn role_qualified_members() {
        let f = kb();
        let d = dispatcher(&f.kb);
        assert_eq!(
            d.invoke_members(operations::FIND_MAX_CLASS, &[f.soups])
                .expect("max"),
            vec![f.dish]
        );
        assert!(d.invoke(operations::FIND_NOT_MAX_CLASS, &[f.soups]).is_err());
        assert!(d.invoke(operations::FIND_KEY_SC_ELEMENT, &[f.soups]).is_err());
    }

    #[test]
    fn description_follows_translation_chain() {
        let f = kb();
        let text = f
            .kb
            .write(|g, k| {
                let key = k.resolve(g, keynodes::RREL_KEY_SC_ELEMENT)?;
                let translation = k.resolve(g, keynodes::NREL_SC_TEXT_TRANSLATION)?;
                let example = k.resolve(g, keynodes::RREL_EXAMPLE)?;
                let ru = k.resolve(g, keynodes::LANG_RU)?;

                let article = g.create_node(NodeKind::Structure)?;
                let membership = g.create_edge(EdgeType::ACCESS_POS_PERM, article, f.borscht)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, key, membership)?;

                let bundle = g.create_node(NodeKind::Plain)?;
                let pair = g.create_edge(EdgeType::COMMON, bundle, article)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, translation, pair)?;

                let text = g.create_link(LinkContent::text("Борщ - суп из свёклы"))?;
                let membership = g.create_edge(EdgeType::ACCESS_POS_PERM, bundle, text)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, example, membership)?;
                g.create_edge(EdgeType::ACCESS_POS_PERM, ru, text)?;
                Ok(text)
            })
            .expect("seed");

        let d = dispatcher(&f.kb);
        assert_eq!(
            d.invoke_members(operations::FIND_DESCRIPTION, &[f.borscht])
                .expect("description"),
            vec![text]
        );
        assert!(d.invoke(operations::FIND_DESCRIPTION, &[f.soups]).is_err());
    }

    #[test]
    fn missing_argument_fails_the_action() {
        let f = kb();
        let d = dispatcher(&f.kb);
        let outcome = d.execute(operations::FIND_INFO, &[]).expect("execute");
        assert!(!outcome.succeeded());
    }
}
