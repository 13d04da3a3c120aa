//! # semnet-core
//!
//! Question answering over a semantic network - THE LOGIC.
//!
//! This crate holds everything that touches the graph:
//! - `types` / `graph` → element model and the `GraphStore` boundary
//! - `template` / `matcher` → triple and quintuple pattern search
//! - `keynodes` / `session` → well-known nodes and the shared knowledge base
//! - `resolver` / `collection` → entity lookup and materialized result sets
//! - `action` / `dispatcher` / `operations` → operations run as actions
//! - `scheme` → process-scheme linearization
//! - `intent` / `pipeline` → classified questions to structured answers
//! - `formats` → JSON knowledge sources
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Has NO async and NO network dependencies (pure Rust)
//! - Iterates deterministically (BTreeMap/BTreeSet only)
//! - Blocks only in the dispatcher's bounded wait for a completion signal
//! - Looks operations up by identifier; the registry is filled at startup

// =============================================================================
// MODULES
// =============================================================================

pub mod action;
pub mod collection;
pub mod dispatcher;
pub mod formats;
pub mod graph;
pub mod intent;
pub mod keynodes;
pub mod matcher;
pub mod operations;
pub mod pipeline;
pub mod primitives;
pub mod resolver;
pub mod scheme;
pub mod session;
pub mod template;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Addr, EdgeForm, EdgeType, Element, LinkContent, NodeKind, Permanence, Polarity, SemnetError,
};

// =============================================================================
// RE-EXPORTS: Graph & Matching
// =============================================================================

pub use collection::Collection;
pub use graph::{Graph, GraphStore};
pub use keynodes::Keynodes;
pub use matcher::Matcher;
pub use resolver::{EntityResolver, resolve_entity};
pub use session::{KnowledgeBase, KnowledgeStats};
pub use template::{Binding, Clause, Template, Term, VarType};

// =============================================================================
// RE-EXPORTS: Actions & Operations
// =============================================================================

pub use action::{ActionContext, ActionOutcome, ActionStatus};
pub use dispatcher::{Dispatcher, Operation, OperationRegistry};
pub use operations::{Search, SearchOperation, SearchSettings};
pub use scheme::{Linearization, SchemeLabels, SchemeLinearizer};

// =============================================================================
// RE-EXPORTS: Questions
// =============================================================================

pub use intent::{AnswerShape, Classification, Domain, Intent, IntentRouter, parse_decision};
pub use pipeline::{Answer, AnswerPhraser, QuestionPipeline, Reply};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{KnowledgeSource, LoadReport};
