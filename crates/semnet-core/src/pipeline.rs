//! # Question Pipeline
//!
//! One sequential call chain per question:
//! classify → resolve → dispatch → read result → name each item.
//!
//! The pipeline produces structured answers. An optional `AnswerPhraser`
//! turns them into text for the user and answers general questions; the
//! core itself never writes user-facing prose.

use crate::dispatcher::Dispatcher;
use crate::intent::{AnswerShape, Intent, IntentRouter};
use crate::primitives::operations;
use crate::resolver::EntityResolver;
use crate::{Addr, SemnetError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Structured answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub intent: Intent,
    pub entity_name: String,
    /// The resolved entity; `None` for intents that need no lookup.
    pub entity: Option<Addr>,
    /// Display texts of the result, in result order.
    pub items: Vec<String>,
}

impl Answer {
    /// Items joined with `"; "`.
    #[must_use]
    pub fn joined(&self) -> String {
        self.items.join("; ")
    }
}

/// Phrases answers for the user. Implementations may block.
pub trait AnswerPhraser: Send + Sync {
    /// Text for an answer found in the knowledge base.
    fn phrase(&self, question: &str, answer: &Answer) -> Result<String, SemnetError>;

    /// Text for a question the knowledge base does not cover.
    fn answer_general(&self, question: &str) -> Result<String, SemnetError>;
}

/// A structured answer and its phrasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(flatten)]
    pub answer: Answer,
    /// `None` without a phraser or for an unrecognized question.
    pub text: Option<String>,
}

/// Classifier + resolver + dispatcher.
#[derive(Clone)]
pub struct QuestionPipeline {
    router: Arc<dyn IntentRouter>,
    phraser: Option<Arc<dyn AnswerPhraser>>,
    resolver: EntityResolver,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for QuestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionPipeline")
            .field("dispatcher", &self.dispatcher)
            .field("phraser", &self.phraser.is_some())
            .finish_non_exhaustive()
    }
}

impl QuestionPipeline {
    #[must_use]
    pub fn new(router: Arc<dyn IntentRouter>, dispatcher: Dispatcher) -> Self {
        Self {
            router,
            phraser: None,
            resolver: EntityResolver::new(dispatcher.kb().clone()),
            dispatcher,
        }
    }

    #[must_use]
    pub fn with_phraser(mut self, phraser: Arc<dyn AnswerPhraser>) -> Self {
        self.phraser = Some(phraser);
        self
    }

    #[must_use]
    pub fn has_phraser(&self) -> bool {
        self.phraser.is_some()
    }

    /// Answer `question` and phrase the answer, if a phraser is set.
    ///
    /// General questions go to the phraser as they are; unrecognized ones
    /// get no text.
    pub fn reply(&self, question: &str) -> Result<Reply, SemnetError> {
        let answer = self.answer(question)?;
        let text = match (self.phraser.as_deref(), answer.intent) {
            (None, _) | (_, Intent::Unrecognized) => None,
            (Some(phraser), Intent::General) => Some(phraser.answer_general(question)?),
            (Some(phraser), _) => Some(phraser.phrase(question, &answer)?),
        };
        Ok(Reply { answer, text })
    }

    /// Classify `question` and answer it.
    pub fn answer(&self, question: &str) -> Result<Answer, SemnetError> {
        let classification = self.router.classify(question)?;
        tracing::info!(
            domain = ?classification.domain,
            intent = classification.intent.decision(),
            entity = %classification.entity_name,
            "question classified"
        );
        self.answer_intent(classification.intent, &classification.entity_name)
    }

    /// Answer an already classified question.
    pub fn answer_intent(&self, intent: Intent, entity_name: &str) -> Result<Answer, SemnetError> {
        let Some(operation) = intent.operation() else {
            return Ok(Answer {
                intent,
                entity_name: entity_name.to_string(),
                entity: None,
                items: Vec::new(),
            });
        };

        let entity = self.resolver.resolve(entity_name)?;
        let result = self.dispatcher.invoke_members(operation, &[entity])?;
        let items = match intent.shape() {
            AnswerShape::Text => result
                .iter()
                .map(|link| self.text_of(*link))
                .collect::<Result<_, _>>()?,
            AnswerShape::Entities => result
                .iter()
                .map(|member| self.name_of(*member))
                .collect::<Result<_, _>>()?,
        };

        Ok(Answer {
            intent,
            entity_name: entity_name.to_string(),
            entity: Some(entity),
            items,
        })
    }

    fn name_of(&self, entity: Addr) -> Result<String, SemnetError> {
        let links = self.dispatcher.invoke_members(operations::FIND_INFO, &[entity])?;
        let link = links
            .first()
            .copied()
            .ok_or_else(|| SemnetError::NoResult(format!("no identifier for {entity}")))?;
        self.text_of(link)
    }

    fn text_of(&self, link: Addr) -> Result<String, SemnetError> {
        self.dispatcher
            .kb()
            .link_text(link)?
            .ok_or_else(|| SemnetError::TypeMismatch(format!("{link} is not a text link")))
    }
}
