//! Collar status and scan diagnostics.

use axum::extract::State;
use axum::Json;
use petfence_core::{PetStatus, ScanResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Latest published status plus the radius it is judged against.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "dentro_do_perimetro": false,
    "distancia_aproximada_metros": 11.22,
    "rssi": -80,
    "ultimo_contato_timestamp": 1_760_000_000.5,
    "mensagem": "Outside perimeter (11.22m > 10m).",
    "raio_configurado_metros": 10.0
}))]
pub struct CollarStatusResponse {
    /// Status fields, flattened into the top-level object.
    #[serde(flatten)]
    pub status: PetStatus,

    /// Radius currently configured, in meters.
    pub raio_configurado_metros: f64,
}

/// Current collar status.
#[utoipa::path(
    get,
    path = "/status_coleira",
    tag = "status",
    operation_id = "getCollarStatus",
    summary = "Get the collar status",
    description = "Returns the status published by the latest monitor tick. \
        Before the first tick completes every field is null and the message \
        says the monitor is waiting for a reading.",
    responses(
        (status = 200, description = "Latest status", body = CollarStatusResponse)
    )
)]
pub async fn collar_status(State(state): State<AppState>) -> Json<CollarStatusResponse> {
    let status = state.status().snapshot().await;
    let raio_configurado_metros = state.config().await.perimeter_radius_m;

    Json(CollarStatusResponse {
        status,
        raio_configurado_metros,
    })
}

/// Outcome of the latest Bluetooth scan.
#[utoipa::path(
    get,
    path = "/ultimo_scan",
    tag = "status",
    operation_id = "getLastScan",
    summary = "Get the last scan result",
    description = "RSSI and epoch timestamp of the most recent scan attempt. \
        `rssi` is null when the collar was not seen.",
    responses(
        (status = 200, description = "Last scan", body = ScanResult)
    )
)]
pub async fn last_scan(State(state): State<AppState>) -> Json<ScanResult> {
    Json(state.last_scan().snapshot().await)
}
