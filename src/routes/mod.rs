pub mod files;
pub mod generate;
pub mod meta;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::services::renderer::WeatherMapService;

/// Shared application state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub maps: Arc<WeatherMapService>,
}

/// All API routes, without the documentation and middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(meta::root))
        .route("/health", get(meta::health_check))
        .route("/countries", get(meta::list_countries))
        .route("/generate", post(generate::generate_map))
        .route("/generate/raw", post(generate::generate_map_raw))
        .route("/generate/all", post(generate::generate_all_maps))
        .route("/meteo/files", get(files::list_generated_files))
        .route("/meteo/:country/:date/:file", get(files::download_artifact))
        .with_state(state)
}
