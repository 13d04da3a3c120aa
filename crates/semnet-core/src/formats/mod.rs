//! # Formats
//!
//! Input formats for seeding a knowledge base. Reading files is left to
//! the app layer; this module only parses and applies.

pub mod kb_source;

pub use kb_source::{ArcKind, KnowledgeSource, LoadReport, SourceArc, SourceLink, SourceNode};
