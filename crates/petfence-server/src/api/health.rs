//! Liveness endpoint at the root path.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Greeting returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "mensagem": "Hello, World!",
    "version": "0.1.0"
}))]
pub struct GreetingResponse {
    /// Fixed greeting.
    #[schema(example = "Hello, World!")]
    pub mensagem: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    operation_id = "hello",
    summary = "Check that the service is up",
    responses(
        (status = 200, description = "Service is running", body = GreetingResponse)
    )
)]
pub async fn hello() -> Json<GreetingResponse> {
    Json(GreetingResponse {
        mensagem: "Hello, World!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
