//! # Service
//!
//! The operations both surfaces offer, over one dispatcher. Every method
//! blocks (dispatcher waits, LLM calls); async callers use `spawn_blocking`.

use crate::config::AppConfig;
use semnet_core::primitives::operations;
use semnet_core::{
    ActionStatus, Addr, AnswerPhraser, Dispatcher, EntityResolver, IntentRouter, KnowledgeStats,
    QuestionPipeline, Reply, SemnetError,
};
use serde::Serialize;
use std::sync::Arc;

// =============================================================================
// RESULTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub elements: usize,
    pub edges: usize,
    pub operations: Vec<String>,
    pub timeout_ms: u64,
    pub router: bool,
    pub phraser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub name: String,
    pub addr: Addr,
}

/// One result item with its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub addr: Addr,
    /// `None` for an item that is neither a text link nor named in the
    /// configured language.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub operation: String,
    pub entity: Addr,
    pub items: Vec<Item>,
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Debug, Clone)]
pub struct Service {
    dispatcher: Dispatcher,
    resolver: EntityResolver,
    pipeline: Option<QuestionPipeline>,
}

impl Service {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, router: Option<Arc<dyn IntentRouter>>) -> Self {
        Self {
            resolver: EntityResolver::new(dispatcher.kb().clone()),
            pipeline: router.map(|r| QuestionPipeline::new(r, dispatcher.clone())),
            dispatcher,
        }
    }

    /// Phrase answers with `phraser`. Has no effect without a router.
    #[must_use]
    pub fn with_phraser(mut self, phraser: Arc<dyn AnswerPhraser>) -> Self {
        self.pipeline = self.pipeline.map(|p| p.with_phraser(phraser));
        self
    }

    /// Load the knowledge source and build the dispatcher and LLM client.
    pub fn from_config(config: &AppConfig) -> Result<Self, SemnetError> {
        let kb = config.load_knowledge()?;
        let dispatcher = config.dispatcher(kb)?;
        Ok(match config.llm_router()? {
            Some(llm) => {
                let router: Arc<dyn IntentRouter> = llm.clone();
                Self::new(dispatcher, Some(router)).with_phraser(llm)
            }
            None => Self::new(dispatcher, None),
        })
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn has_router(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn status(&self) -> Result<ServiceStatus, SemnetError> {
        let KnowledgeStats { elements, edges } = self.dispatcher.kb().stats()?;
        Ok(ServiceStatus {
            elements,
            edges,
            operations: self
                .dispatcher
                .registry()
                .identifiers()
                .map(str::to_string)
                .collect(),
            timeout_ms: self.dispatcher.timeout().as_millis() as u64,
            router: self.has_router(),
            phraser: self.pipeline.as_ref().is_some_and(QuestionPipeline::has_phraser),
        })
    }

    pub fn resolve(&self, name: &str) -> Result<Resolved, SemnetError> {
        Ok(Resolved {
            name: name.to_string(),
            addr: self.resolver.resolve(name)?,
        })
    }

    /// Run `operation` on the entity called `name` and describe its result.
    pub fn invoke(&self, operation: &str, name: &str) -> Result<Invocation, SemnetError> {
        let entity = self.resolver.resolve(name)?;
        let members = self.dispatcher.invoke_members(operation, &[entity])?;
        let items = members
            .into_iter()
            .map(|addr| {
                Ok(Item {
                    addr,
                    text: self.display_text(addr)?,
                })
            })
            .collect::<Result<_, SemnetError>>()?;

        Ok(Invocation {
            operation: operation.to_string(),
            entity,
            items,
        })
    }

    /// Rendered stages of the scheme called `name`.
    pub fn stages(&self, name: &str) -> Result<String, SemnetError> {
        let scheme = self.resolver.resolve(name)?;
        let members = self
            .dispatcher
            .invoke_members(operations::FIND_STAGES_LIST, &[scheme])?;
        let link = members
            .first()
            .copied()
            .ok_or_else(|| SemnetError::NoResult(format!("no stages for {:?}", name)))?;
        self.dispatcher
            .kb()
            .link_text(link)?
            .ok_or_else(|| SemnetError::TypeMismatch(format!("{} is not a text link", link)))
    }

    /// Answer a free-text question through the configured router and
    /// phrase it, if a phraser is set.
    pub fn ask(&self, question: &str) -> Result<Reply, SemnetError> {
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            SemnetError::ClassificationFailed("no intent router configured".to_string())
        })?;
        pipeline.reply(question)
    }

    /// The text of a link, or the main identifier of a node.
    ///
    /// An identifier search that finishes unsuccessfully means the node is
    /// unnamed; any other failure is returned.
    fn display_text(&self, addr: Addr) -> Result<Option<String>, SemnetError> {
        if let Some(text) = self.dispatcher.kb().link_text(addr)? {
            return Ok(Some(text));
        }
        let outcome = self.dispatcher.execute(operations::FIND_INFO, &[addr])?;
        if outcome.status != ActionStatus::Succeeded {
            return Ok(None);
        }
        match self.dispatcher.result_members(outcome.action)?.first() {
            Some(link) => self.dispatcher.kb().link_text(*link),
            None => Ok(None),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
