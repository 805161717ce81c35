//! Read-only view of the collar configuration.

use axum::extract::State;
use axum::Json;
use petfence_core::Config;

use crate::state::AppState;

/// Current configuration record.
#[utoipa::path(
    get,
    path = "/configuracao_atual",
    tag = "config",
    operation_id = "getConfig",
    summary = "Get the current configuration",
    responses(
        (status = 200, description = "Configuration in effect", body = Config)
    )
)]
pub async fn current_config(State(state): State<AppState>) -> Json<Config> {
    Json(state.config().await.clone())
}
