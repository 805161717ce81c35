//! Perimeter radius updates.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /configurar_perimetro`.
///
/// Only documents the shape; the handler also accepts the radius as a
/// numeric string.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "raio_metros": 15.5 }))]
pub struct RadiusRequest {
    /// New radius in meters. Must be finite and positive.
    #[schema(example = 15.5)]
    pub raio_metros: f64,
}

/// Response after a successful update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "mensagem": "Perimeter radius set to 15.5 meters.",
    "raio_metros": 15.5
}))]
pub struct RadiusUpdated {
    /// Confirmation message.
    pub mensagem: String,

    /// Radius now in effect, as read back from the configuration file.
    pub raio_metros: f64,
}

/// Read `raio_metros` as a number or a numeric string.
fn parse_radius(body: &Value) -> ApiResult<f64> {
    let raw = body.get("raio_metros").ok_or_else(|| {
        ApiError::bad_request("MISSING_RADIUS", "Field 'raio_metros' is required")
    })?;

    let radius = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    radius.ok_or_else(|| {
        ApiError::bad_request(
            "INVALID_RADIUS",
            format!("'raio_metros' must be a number, got {raw}"),
        )
    })
}

/// Update the perimeter radius.
///
/// The new value is written to the configuration file, read back, and only
/// then made visible to the monitor, which uses it from its next tick. The
/// write lock is held across the file update so concurrent requests apply
/// in order; the file I/O itself runs on the blocking pool.
#[utoipa::path(
    post,
    path = "/configurar_perimetro",
    tag = "perimeter",
    operation_id = "setPerimeterRadius",
    summary = "Set the perimeter radius",
    request_body = RadiusRequest,
    responses(
        (status = 200, description = "Radius saved", body = RadiusUpdated),
        (status = 400, description = "Body is not JSON or the radius is missing, non-numeric, or not positive", body = crate::api::error::ErrorResponse),
        (status = 500, description = "Configuration could not be saved", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn configure_perimeter(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<RadiusUpdated>> {
    let Json(body) = payload.map_err(|rejection| {
        ApiError::bad_request(
            "INVALID_JSON",
            format!("Request body must be JSON: {}", rejection.body_text()),
        )
    })?;
    let radius = parse_radius(&body)?;

    let mut config = state.config_mut().await;
    let store = state.store().clone();
    let updated = tokio::task::spawn_blocking(move || store.update_radius(radius))
        .await
        .map_err(|e| ApiError::InternalError {
            error_code: "TASK_FAILED".to_string(),
            message: "Failed to save the configuration".to_string(),
            details: Some(e.to_string()),
        })??;
    let applied = updated.perimeter_radius_m;
    *config = updated;
    drop(config);

    info!(radius_m = applied, "Perimeter radius applied");
    Ok(Json(RadiusUpdated {
        mensagem: format!("Perimeter radius set to {applied} meters."),
        raio_metros: applied,
    }))
}
