use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse, MAPS_FAILURE, MAP_FAILURE};
use crate::models::{GenerateRequest, LocationsPayload, MeteoLocation, PayloadError};
use crate::routes::AppState;
use crate::services::location::WeatherLocation;
use crate::services::renderer::{MapOptions, RenderError, WeatherMapService};

/// Server-side path of the persisted image ("" when not persisted).
pub const X_SAVED_PATH: HeaderName = HeaderName::from_static("x-saved-path");

/// Response for `POST /generate/all`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateAllResponse {
    /// Always "success"
    pub status: String,
    /// Country code as sent by the caller
    pub country: String,
    /// Variant name → saved path
    pub generated_files: BTreeMap<String, String>,
    pub count: usize,
}

/// Generate a weather map from meteo data.
///
/// The country is taken from the `capital` field of the first location.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "Maps",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Rendered map", content_type = "image/png", body = Vec<u8>,
            headers(("x-saved-path" = String, description = "Where the image was saved"))),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "No map for the country", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse),
    )
)]
pub async fn generate_map(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: GenerateRequest =
        serde_json::from_slice(&body).map_err(PayloadError::InvalidJson)?;
    if request.meteo_data.is_empty() {
        return Err(PayloadError::Empty.into());
    }
    let country = request.meteo_data[0]
        .country_code()
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::BadRequest("Country code (capital field) is required in meteo data".to_string())
        })?;

    let locations = into_weather_locations(request.meteo_data);
    let options = MapOptions {
        title: request.title,
        day_index: request.day_index.unwrap_or(0),
        variant: request.variant.unwrap_or_default(),
        save_to_disk: true,
    };

    tracing::info!(country = %country, locations = locations.len(), "Generating map");
    let code = country.clone();
    let map = render_blocking(state.maps, MAP_FAILURE, move |maps| {
        maps.generate_map(&locations, &code, &options)
    })
    .await?;

    let saved = map
        .saved_path
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let disposition = format!("inline; filename=weather_map_{}.png", country);
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CONTENT_DISPOSITION, header_value(&disposition)?),
            (X_SAVED_PATH, header_value(&saved)?),
        ],
        map.png,
    )
        .into_response())
}

/// Generate a weather map from a bare locations array.
///
/// Accepts the array itself, `{"json": [...]}` or `{"json": "<encoded array>"}`.
#[utoipa::path(
    post,
    path = "/generate/raw",
    tag = "Maps",
    request_body = Vec<MeteoLocation>,
    responses(
        (status = 200, description = "Rendered map", content_type = "image/png", body = Vec<u8>,
            headers(("x-saved-path" = String, description = "Where the image was saved"))),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "No map for the country", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse),
    )
)]
pub async fn generate_map_raw(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let (locations, country) = batch_request(&state, &body)?;

    tracing::info!(country = %country, locations = locations.len(), "Generating map (raw)");
    let map = render_blocking(state.maps, MAP_FAILURE, move |maps| {
        maps.generate_map(&locations, &country, &MapOptions::default())
    })
    .await?;

    let saved = map
        .saved_path
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (X_SAVED_PATH, header_value(&saved)?),
        ],
        map.png,
    )
        .into_response())
}

/// Generate and save the maxtemp, mintemp, wind and sun maps in one call.
#[utoipa::path(
    post,
    path = "/generate/all",
    tag = "Maps",
    request_body = Vec<MeteoLocation>,
    responses(
        (status = 200, description = "Paths of the saved maps", body = GenerateAllResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "No map for the country", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse),
    )
)]
pub async fn generate_all_maps(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateAllResponse>, AppError> {
    let (locations, country) = batch_request(&state, &body)?;

    tracing::info!(country = %country, locations = locations.len(), "Generating all maps");
    let code = country.clone();
    let files = render_blocking(state.maps, MAPS_FAILURE, move |maps| {
        maps.generate_all_maps(&locations, &code, 0)
    })
    .await?;

    let generated_files: BTreeMap<String, String> = files
        .into_iter()
        .map(|(variant, path)| (variant.as_str().to_string(), path.display().to_string()))
        .collect();
    Ok(Json(GenerateAllResponse {
        status: "success".to_string(),
        country,
        count: generated_files.len(),
        generated_files,
    }))
}

/// Validate a `/generate/raw` or `/generate/all` body and resolve its country.
fn batch_request(state: &AppState, body: &[u8]) -> Result<(Vec<WeatherLocation>, String), AppError> {
    let meteo = LocationsPayload::from_body(body)?.into_locations()?;
    let country = meteo[0]
        .country_code()
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("Country code (capital field) is required".to_string()))?;
    if state.maps.catalog().resolve(&country).is_none() {
        return Err(AppError::NotFound(format!(
            "Map not found for country: {}",
            country
        )));
    }
    Ok((into_weather_locations(meteo), country))
}

fn into_weather_locations(meteo: Vec<MeteoLocation>) -> Vec<WeatherLocation> {
    meteo.into_iter().map(WeatherLocation::from).collect()
}

/// Run a render on the blocking pool; `context` prefixes internal failures.
async fn render_blocking<T, F>(
    maps: Arc<WeatherMapService>,
    context: &'static str,
    job: F,
) -> Result<T, AppError>
where
    F: FnOnce(&WeatherMapService) -> Result<T, RenderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&maps))
        .await
        .map_err(|e| AppError::InternalError(format!("{}: render task failed: {}", context, e)))?
        .map_err(|e| AppError::from_render(e, context))
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::InternalError(format!("Invalid header value {:?}: {}", value, e)))
}
