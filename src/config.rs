/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Directory scanned at startup for per-country GeoJSON outlines.
    pub maps_dir: String,
    /// Root under which rendered maps are persisted and served from.
    pub output_dir: String,
    /// Raster resolution of rendered maps (the figure is 12 x 11 inches).
    pub map_dpi: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            maps_dir: std::env::var("MAPS_DIR").unwrap_or_else(|_| "./maps".to_string()),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "./meteo".to_string()),
            map_dpi: std::env::var("MAP_DPI")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .expect("MAP_DPI must be a positive integer"),
        }
    }
}
