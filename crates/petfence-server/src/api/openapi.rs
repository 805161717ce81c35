//! OpenAPI document for the petfence API.

use axum::Json;
use petfence_core::{Config, PetStatus, ScanResult};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::health::GreetingResponse;
use super::perimeter::{RadiusRequest, RadiusUpdated};
use super::status::CollarStatusResponse;

/// Serve the OpenAPI document at `/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// OpenAPI document for petfence.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "petfence API",
        description = r"
# petfence API

Watches a pet's Bluetooth collar and reports whether it is inside a circular
perimeter around the receiver.

The distance is estimated from the collar's RSSI with the log-distance
path-loss model, so it is approximate and sensitive to walls and bodies.
A collar that cannot be heard is reported as outside the perimeter.
",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local petfence server")
    ),
    tags(
        (name = "system", description = "Liveness"),
        (name = "status", description = "Collar status and scan diagnostics"),
        (name = "perimeter", description = "Perimeter radius management"),
        (name = "config", description = "Collar configuration")
    ),
    paths(
        super::health::hello,
        super::status::collar_status,
        super::status::last_scan,
        super::perimeter::configure_perimeter,
        super::config::current_config,
    ),
    components(
        schemas(
            ErrorResponse,
            GreetingResponse,
            CollarStatusResponse,
            PetStatus,
            ScanResult,
            RadiusRequest,
            RadiusUpdated,
            Config,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "petfence API");
        for path in [
            "/",
            "/status_coleira",
            "/ultimo_scan",
            "/configurar_perimetro",
            "/configuracao_atual",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_version_follows_the_crate() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }
}
