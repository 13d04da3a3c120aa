//! # Intent Model
//!
//! The closed set of question intents and the boundary to whatever
//! classifies free text into one of them.
//!
//! A classifier answers in two steps: a subject domain label, then a JSON
//! decision `{"decision": "...", "entity_name": "..."}`. Decisions outside
//! the known set become `Intent::Unrecognized`; output that is not a decision
//! object at all is a `ClassificationFailed` error.

use crate::primitives::operations;
use crate::SemnetError;
use serde::{Deserialize, Serialize};

// =============================================================================
// DOMAINS
// =============================================================================

/// Subject domain of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    StructureAndHierarchy,
    DescriptionAndCharacteristics,
    ClassificationAndCategorization,
    SemanticRelationships,
    General,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::StructureAndHierarchy,
        Domain::DescriptionAndCharacteristics,
        Domain::ClassificationAndCategorization,
        Domain::SemanticRelationships,
        Domain::General,
    ];

    /// Label the classifier is asked to answer with.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Domain::StructureAndHierarchy => "Структура и Иерархия",
            Domain::DescriptionAndCharacteristics => "Описание и Характеристики",
            Domain::ClassificationAndCategorization => "Классификация и Категоризация",
            Domain::SemanticRelationships => "Семантические Связи и Знания",
            Domain::General => "Общие Запросы",
        }
    }

    /// English label, also accepted by `parse`.
    #[must_use]
    pub fn english_label(self) -> &'static str {
        match self {
            Domain::StructureAndHierarchy => "Structure and Hierarchy",
            Domain::DescriptionAndCharacteristics => "Description and Characteristics",
            Domain::ClassificationAndCategorization => "Classification and Categorization",
            Domain::SemanticRelationships => "Semantic Relationships and Knowledge",
            Domain::General => "General Queries",
        }
    }

    /// Parse a classifier label. Surrounding whitespace, quotes and a
    /// trailing period are ignored; case is not.
    #[must_use]
    pub fn parse(label: &str) -> Option<Domain> {
        let cleaned = label
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '«' || c == '»')
            .trim_end_matches('.')
            .trim()
            .to_lowercase();
        Domain::ALL.into_iter().find(|d| {
            d.label().to_lowercase() == cleaned || d.english_label().to_lowercase() == cleaned
        })
    }

    /// Intents a question in this domain can resolve to.
    #[must_use]
    pub fn intents(self) -> &'static [Intent] {
        match self {
            Domain::StructureAndHierarchy => &[
                Intent::Children,
                Intent::Parents,
                Intent::ParentDecomposition,
                Intent::Decompositions,
                Intent::StagesList,
            ],
            Domain::DescriptionAndCharacteristics => &[Intent::Description],
            Domain::ClassificationAndCategorization => &[Intent::MaxClass, Intent::NotMaxClass],
            Domain::SemanticRelationships => &[Intent::KeyElements],
            Domain::General => &[Intent::General],
        }
    }
}

// =============================================================================
// INTENTS
// =============================================================================

/// What a question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "children_needed")]
    Children,
    #[serde(rename = "parents_needed")]
    Parents,
    #[serde(rename = "parent_decomposition_needed")]
    ParentDecomposition,
    #[serde(rename = "decompositions_needed")]
    Decompositions,
    #[serde(rename = "description_needed")]
    Description,
    #[serde(rename = "max_class_needed")]
    MaxClass,
    #[serde(rename = "not_max_class_needed")]
    NotMaxClass,
    #[serde(rename = "key_sc_element_needed")]
    KeyElements,
    #[serde(rename = "stages_list_needed")]
    StagesList,
    #[serde(rename = "general_query")]
    General,
    /// Any decision string not listed above.
    #[serde(rename = "unrecognized")]
    Unrecognized,
}

/// How an intent's result is turned into answer items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    /// Result items are entities; each is named by its main identifier.
    Entities,
    /// Result items are text links, returned verbatim.
    Text,
}

impl Intent {
    /// Decision string used by the classifier.
    #[must_use]
    pub fn decision(self) -> &'static str {
        match self {
            Intent::Children => "children_needed",
            Intent::Parents => "parents_needed",
            Intent::ParentDecomposition => "parent_decomposition_needed",
            Intent::Decompositions => "decompositions_needed",
            Intent::Description => "description_needed",
            Intent::MaxClass => "max_class_needed",
            Intent::NotMaxClass => "not_max_class_needed",
            Intent::KeyElements => "key_sc_element_needed",
            Intent::StagesList => "stages_list_needed",
            Intent::General => "general_query",
            Intent::Unrecognized => "unrecognized",
        }
    }

    /// Parse a decision string; unknown strings are `Unrecognized`.
    #[must_use]
    pub fn from_decision(decision: &str) -> Intent {
        let decision = decision.trim();
        Self::KNOWN
            .into_iter()
            .find(|intent| intent.decision() == decision)
            .unwrap_or(Intent::Unrecognized)
    }

    const KNOWN: [Intent; 10] = [
        Intent::Children,
        Intent::Parents,
        Intent::ParentDecomposition,
        Intent::Decompositions,
        Intent::Description,
        Intent::MaxClass,
        Intent::NotMaxClass,
        Intent::KeyElements,
        Intent::StagesList,
        Intent::General,
    ];

    /// Operation that answers this intent, if any.
    #[must_use]
    pub fn operation(self) -> Option<&'static str> {
        match self {
            Intent::Children => Some(operations::FIND_INCLUDED_CHILDREN),
            Intent::Parents => Some(operations::FIND_INCLUDED_IN_PARENTS),
            Intent::ParentDecomposition => Some(operations::FIND_PARENT_DECOMPOSITION),
            Intent::Decompositions => Some(operations::FIND_IN_DECOMPOSITIONS),
            Intent::Description => Some(operations::FIND_DESCRIPTION),
            Intent::MaxClass => Some(operations::FIND_MAX_CLASS),
            Intent::NotMaxClass => Some(operations::FIND_NOT_MAX_CLASS),
            Intent::KeyElements => Some(operations::FIND_KEY_SC_ELEMENT),
            Intent::StagesList => Some(operations::FIND_STAGES_LIST),
            Intent::General | Intent::Unrecognized => None,
        }
    }

    #[must_use]
    pub fn shape(self) -> AnswerShape {
        match self {
            Intent::Description | Intent::StagesList => AnswerShape::Text,
            _ => AnswerShape::Entities,
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classifier output for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub domain: Domain,
    pub intent: Intent,
    /// Verbatim if quoted in the question, otherwise the base form.
    pub entity_name: String,
}

#[derive(Deserialize)]
struct Decision {
    decision: Option<String>,
    #[serde(default)]
    entity_name: String,
}

/// Parse a decision object for `domain`.
///
/// Code fences around the object are tolerated.
pub fn parse_decision(domain: Domain, raw: &str) -> Result<Classification, SemnetError> {
    let body = strip_code_fence(raw);
    let decision: Decision = serde_json::from_str(body).map_err(|e| {
        SemnetError::ClassificationFailed(format!("malformed decision {raw:?}: {e}"))
    })?;

    Ok(Classification {
        domain,
        intent: decision
            .decision
            .as_deref()
            .map_or(Intent::Unrecognized, Intent::from_decision),
        entity_name: decision.entity_name,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Classifies free text. Implementations may block.
pub trait IntentRouter: Send + Sync {
    fn classify(&self, question: &str) -> Result<Classification, SemnetError>;
}
