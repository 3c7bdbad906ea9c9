use axum::extract::{Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::artifacts::{list_artifacts, ArtifactListing};

/// List generated map images by country and date.
#[utoipa::path(
    get,
    path = "/meteo/files",
    tag = "Files",
    responses(
        (status = 200, description = "Generated images grouped by country and date", body = ArtifactListing),
        (status = 500, description = "Output directory could not be read", body = ErrorResponse),
    )
)]
pub async fn list_generated_files(
    State(state): State<AppState>,
) -> Result<Json<ArtifactListing>, AppError> {
    let root = state.maps.output_dir().to_path_buf();
    let listing = tokio::task::spawn_blocking(move || list_artifacts(&root))
        .await
        .map_err(|e| AppError::InternalError(format!("Listing task failed: {}", e)))?
        .map_err(|e| AppError::InternalError(format!("Failed to list generated files: {}", e)))?;
    Ok(Json(listing))
}

/// Download one persisted image.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path((country, date, file)): Path<(String, String, String)>,
    request: Request,
) -> Result<Response, AppError> {
    if ![&country, &date, &file].iter().all(|s| is_plain_segment(s)) {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let path = state.maps.output_dir().join(&country).join(&date).join(&file);
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.into_response())
}

/// A single visible path component: no separators, no dot prefix.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.contains(['/', '\\'])
        && !segment.contains('\0')
}
