// Weather Map API v0.1
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::catalog::CountryCatalog;
use services::renderer::WeatherMapService;

/// Weather Map API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Map API",
        version = "0.1.0",
        description = "Renders daily weather forecasts for a set of locations onto \
            country outline maps. Maps are returned as PNG images and saved under \
            the output directory by country and generation date.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Meta", description = "Service manifest, health and country catalog"),
        (name = "Maps", description = "Weather map generation"),
        (name = "Files", description = "Previously generated maps"),
    ),
    paths(
        routes::meta::root,
        routes::meta::health_check,
        routes::meta::list_countries,
        routes::generate::generate_map,
        routes::generate::generate_map_raw,
        routes::generate::generate_all_maps,
        routes::files::list_generated_files,
    ),
    components(
        schemas(
            routes::meta::ServiceManifest,
            routes::meta::HealthResponse,
            routes::meta::CountriesResponse,
            routes::generate::GenerateAllResponse,
            models::GenerateRequest,
            models::MeteoLocation,
            models::DailyData,
            models::DailyUnits,
            services::variant::MapVariant,
            services::artifacts::ArtifactListing,
            services::artifacts::ArtifactFile,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_map_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Load the country catalog once; it is read-only afterwards
    let maps_dir = std::path::Path::new(&config.maps_dir);
    let catalog = CountryCatalog::scan(maps_dir).expect("Failed to scan maps directory");
    tracing::info!(
        "Loaded {} country maps from {}: {:?}",
        catalog.len(),
        maps_dir.display(),
        catalog.codes()
    );
    if catalog.is_empty() {
        tracing::warn!("No country maps found in {}", maps_dir.display());
    }

    std::fs::create_dir_all(&config.output_dir).expect("Failed to create output directory");
    tracing::info!("Saving generated maps under {}", config.output_dir);

    let app_state = AppState {
        maps: Arc::new(WeatherMapService::new(
            catalog,
            &config.output_dir,
            config.map_dpi,
        )),
    };

    // CORS: any origin; expose X-Saved-Path so browsers can read it
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([routes::generate::X_SAVED_PATH]);

    let app = routes::router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
