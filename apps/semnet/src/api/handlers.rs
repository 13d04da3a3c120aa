//! # API Endpoint Handlers
//!
//! Core calls block, so every handler moves its work onto tokio's blocking
//! pool. Errors become `ApiError`, which picks the status code.

use super::{
    AppState,
    types::{
        AskRequest, ErrorResponse, HealthResponse, InvokeRequest, ResolveRequest, StagesRequest,
        StagesResponse,
    },
};
use crate::service::{Invocation, Resolved, Service, ServiceStatus};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use semnet_core::{Reply, SemnetError};

// =============================================================================
// ERRORS
// =============================================================================

/// A handler failure with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Status code for a core error.
pub fn status_for(error: &SemnetError) -> StatusCode {
    match error {
        SemnetError::EntityNotFound(_) | SemnetError::KeynodeNotFound(_) => StatusCode::NOT_FOUND,
        SemnetError::InvalidArguments(_)
        | SemnetError::UnknownOperation(_)
        | SemnetError::InvalidTemplate(_)
        | SemnetError::UnknownVariable(_) => StatusCode::BAD_REQUEST,
        SemnetError::ClassificationFailed(_)
        | SemnetError::MalformedScheme { .. }
        | SemnetError::DescriptionNotFound { .. }
        | SemnetError::OperationFailed { .. }
        | SemnetError::NoResult(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SemnetError::OperationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SemnetError> for ApiError {
    fn from(error: SemnetError) -> Self {
        Self::new(status_for(&error), error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, "request failed: {}", self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Run `work` against the service on the blocking pool.
async fn blocking<T, F>(state: &AppState, work: F) -> Result<Json<T>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Service) -> Result<T, SemnetError> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || work(&service))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("task failed: {}", e)))?
        .map(Json)
        .map_err(ApiError::from)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<ServiceStatus>, ApiError> {
    blocking(&state, |service| service.status()).await
}

pub async fn resolve_handler(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<Resolved>, ApiError> {
    request.validate()?;
    blocking(&state, move |service| service.resolve(&request.name)).await
}

pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<Invocation>, ApiError> {
    request.validate()?;
    blocking(&state, move |service| {
        service.invoke(&request.operation, &request.name)
    })
    .await
}

pub async fn stages_handler(
    State(state): State<AppState>,
    Json(request): Json<StagesRequest>,
) -> Result<Json<StagesResponse>, ApiError> {
    request.validate()?;
    blocking(&state, move |service| {
        let stages = service.stages(&request.name)?;
        Ok(StagesResponse {
            scheme: request.name,
            stages,
        })
    })
    .await
}

/// Answer a question; 503 when no intent router is configured.
pub async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Reply>, ApiError> {
    if !state.service.has_router() {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "no intent router configured",
        ));
    }
    request.validate()?;
    blocking(&state, move |service| service.ask(&request.question)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use semnet_core::Addr;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            status_for(&SemnetError::EntityNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&SemnetError::UnknownOperation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SemnetError::MalformedScheme { start_nodes: 0 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&SemnetError::OperationFailed {
                operation: "x".into(),
                action: Addr(1),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&SemnetError::OperationTimeout {
                operation: "x".into(),
                timeout_ms: 5,
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&SemnetError::StoreUnavailable("poisoned".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
