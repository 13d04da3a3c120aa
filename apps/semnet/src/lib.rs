//! # semnet
//!
//! Server and CLI around `semnet-core`: TOML configuration, the LLM intent
//! router, and the HTTP API. `main.rs` wires these into the binary.

pub mod api;
pub mod cli;
pub mod config;
pub mod llm;
pub mod service;
