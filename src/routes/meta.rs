use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;

/// Capability manifest returned by `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceManifest {
    pub service: String,
    pub version: String,
    /// Endpoint → short description
    pub endpoints: BTreeMap<String, String>,
    /// Static download pattern → description
    pub static_files: BTreeMap<String, String>,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" once the server is up
    pub status: String,
    /// Number of country outlines in the catalog
    pub maps_loaded: usize,
}

/// Response for `GET /countries`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountriesResponse {
    /// Supported country codes, sorted
    pub available_countries: Vec<String>,
    pub count: usize,
}

const ENDPOINTS: &[(&str, &str)] = &[
    ("POST /generate", "Generate weather map from meteo data"),
    ("POST /generate/raw", "Generate weather map (simplified)"),
    (
        "POST /generate/all",
        "Generate all 4 map types (maxtemp, mintemp, wind, sun)",
    ),
    ("GET /countries", "List available country maps"),
    ("GET /meteo/files", "List all generated weather maps"),
    ("GET /health", "Health check"),
];

/// Service name, version and the endpoints it offers.
#[utoipa::path(
    get,
    path = "/",
    tag = "Meta",
    responses(
        (status = 200, description = "Capability manifest", body = ServiceManifest),
    )
)]
pub async fn root() -> Json<ServiceManifest> {
    let endpoints = ENDPOINTS
        .iter()
        .map(|(route, about)| (route.to_string(), about.to_string()))
        .collect();
    let static_files = BTreeMap::from([(
        "/meteo/{country}/{date}/{filename}".to_string(),
        "Download generated weather maps (static files)".to_string(),
    )]);

    Json(ServiceManifest {
        service: "Weather Map API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
        static_files,
    })
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Meta",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        maps_loaded: state.maps.catalog().len(),
    })
}

/// List the country codes that have an outline map.
#[utoipa::path(
    get,
    path = "/countries",
    tag = "Meta",
    responses(
        (status = 200, description = "Supported country codes", body = CountriesResponse),
    )
)]
pub async fn list_countries(State(state): State<AppState>) -> Json<CountriesResponse> {
    let available_countries = state.maps.available_countries();
    Json(CountriesResponse {
        count: available_countries.len(),
        available_countries,
    })
}
