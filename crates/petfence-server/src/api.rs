//! HTTP API routes and handlers.
//!
//! - `health` - Liveness greeting
//! - `status` - Collar status and last scan
//! - `perimeter` - Radius updates
//! - `config` - Current configuration
//! - `error` - API error types
//! - `openapi` - OpenAPI document

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod config;
pub mod error;
pub mod health;
pub mod openapi;
pub mod perimeter;
pub mod status;

pub use error::{ApiError, ApiResult, ErrorResponse};

/// Creates the API router.
///
/// ```text
/// GET  /                      - Liveness greeting
/// GET  /status_coleira        - Latest collar status
/// GET  /ultimo_scan           - Last scan attempt
/// POST /configurar_perimetro  - Update the perimeter radius
/// GET  /configuracao_atual    - Current configuration
/// GET  /openapi.json          - OpenAPI document
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::hello))
        .route("/status_coleira", get(status::collar_status))
        .route("/ultimo_scan", get(status::last_scan))
        .route("/configurar_perimetro", post(perimeter::configure_perimeter))
        .route("/configuracao_atual", get(config::current_config))
        .route("/openapi.json", get(openapi::get_openapi_spec))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
