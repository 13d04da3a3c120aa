//! # semnet HTTP API
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Knowledge base status and registered operations
//! - `POST /resolve` - `{"name"}` to the owning node
//! - `POST /invoke` - `{"operation", "name"}` to the described result items
//! - `POST /stages` - `{"name"}` of a process scheme to its rendered stages
//! - `POST /ask` - `{"question"}` to a structured answer (503 without a router)
//!
//! ## Environment
//!
//! - `SEMNET_CORS_ORIGINS`: comma-separated allowed origins, or `*` (default: localhost only)
//! - `SEMNET_RATE_LIMIT`: requests per second (default: 100, 0 to disable)
//! - `SEMNET_API_KEY`: if set, requires bearer authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{get_api_key_from_env, keys_match};
pub use handlers::{ApiError, status_for};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AskRequest, ErrorResponse, HealthResponse, InvokeRequest, ResolveRequest, StagesRequest,
    StagesResponse,
};

use crate::service::Service;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use semnet_core::SemnetError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request bodies are small JSON objects.
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state. The service is a cheap handle over the shared
/// knowledge base, so each request clones it.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Service,
}

impl AppState {
    #[must_use]
    pub fn new(service: Service) -> Self {
        Self { service }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// CORS from `SEMNET_CORS_ORIGINS`; localhost only when unset or invalid.
fn build_cors_layer() -> CorsLayer {
    match std::env::var("SEMNET_CORS_ORIGINS").ok().as_deref() {
        Some("*") => {
            tracing::warn!("CORS: allowing ALL origins (SEMNET_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed = parse_origins(origins);
            if allowed.is_empty() {
                tracing::warn!("CORS: no valid origins in SEMNET_CORS_ORIGINS, using localhost");
                restricted_cors(localhost_origins())
            } else {
                restricted_cors(allowed)
            }
        }
        None => restricted_cors(localhost_origins()),
    }
}

fn parse_origins(origins: &str) -> Vec<HeaderValue> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: invalid origin '{}': {}", s, e);
                None
            }
        })
        .collect()
}

fn localhost_origins() -> Vec<HeaderValue> {
    [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect()
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// The router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit,
/// rate limiting (if enabled), authentication (if configured).
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!("API key authentication DISABLED; set SEMNET_API_KEY to enable it");
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/resolve", post(handlers::resolve_handler))
        .route("/invoke", post(handlers::invoke_handler))
        .route("/stages", post(handlers::stages_handler))
        .route("/ask", post(handlers::ask_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve `service` on `addr` until the process stops.
pub async fn run_server(addr: &str, service: Service) -> Result<(), SemnetError> {
    let router = create_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SemnetError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("semnet HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SemnetError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_filtered() {
        let origins = parse_origins(" http://a.example , ,http://b.example");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://a.example");
    }

    #[test]
    fn localhost_defaults_parse() {
        assert_eq!(localhost_origins().len(), 4);
    }
}
