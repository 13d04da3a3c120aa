//! # API Request/Response Types
//!
//! JSON bodies of the HTTP API. Successful lookups reuse the service result
//! types (`Resolved`, `Invocation`, `ServiceStatus`) and the core `Reply`.

use semnet_core::SemnetError;
use semnet_core::primitives::MAX_NAME_LENGTH;
use serde::{Deserialize, Serialize};

/// Maximum question length in bytes.
pub const MAX_QUESTION_LENGTH: usize = 4096;

fn check_text(field: &str, value: &str, max: usize) -> Result<(), SemnetError> {
    if value.trim().is_empty() {
        return Err(SemnetError::InvalidArguments(format!("{} is empty", field)));
    }
    if value.len() > max {
        return Err(SemnetError::InvalidArguments(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            value.len(),
            max
        )));
    }
    Ok(())
}

// =============================================================================
// HEALTH / ERROR
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub name: String,
}

impl ResolveRequest {
    pub fn validate(&self) -> Result<(), SemnetError> {
        check_text("name", &self.name, MAX_NAME_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Operation identifier, e.g. `action_find_included_children`.
    pub operation: String,
    pub name: String,
}

impl InvokeRequest {
    pub fn validate(&self) -> Result<(), SemnetError> {
        check_text("operation", &self.operation, MAX_NAME_LENGTH)?;
        check_text("name", &self.name, MAX_NAME_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesRequest {
    /// Main identifier of the process scheme.
    pub name: String,
}

impl StagesRequest {
    pub fn validate(&self) -> Result<(), SemnetError> {
        check_text("name", &self.name, MAX_NAME_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesResponse {
    pub scheme: String,
    pub stages: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

impl AskRequest {
    pub fn validate(&self) -> Result<(), SemnetError> {
        check_text("question", &self.question, MAX_QUESTION_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_oversized_fields_are_rejected() {
        let blank = ResolveRequest {
            name: "  ".to_string(),
        };
        assert!(matches!(
            blank.validate(),
            Err(SemnetError::InvalidArguments(_))
        ));

        let long = AskRequest {
            question: "я".repeat(MAX_QUESTION_LENGTH),
        };
        assert!(long.validate().is_err());

        let ok = InvokeRequest {
            operation: "action_find_info".to_string(),
            name: "Дерево".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
