//! Weather map rendering.
//!
//! One call to [`WeatherMapService::generate_map`] produces one PNG: the
//! country outline as the basemap, one colored marker and one boxed label per
//! location, and a title. Locations are drawn lowest importance first so the
//! most important markers and labels end up on top.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::services::basemap::{Basemap, BasemapError};
use crate::services::canvas::{
    Bounds, Canvas, CanvasError, Color, LabelBox, PixelRect, Viewport,
};
use crate::services::catalog::CountryCatalog;
use crate::services::location::{DayValues, WeatherLocation};
use crate::services::variant::MapVariant;

/// Figure size in inches.
const FIGURE_WIDTH_IN: f32 = 12.0;
const FIGURE_HEIGHT_IN: f32 = 11.0;

/// Plot area as fractions of the figure (left, right, bottom, top).
const PLOT_LEFT: f32 = 0.125;
const PLOT_RIGHT: f32 = 0.9;
const PLOT_BOTTOM: f32 = 0.11;
const PLOT_TOP: f32 = 0.88;

/// Autoscale margin on each side of the data extent.
const DATA_MARGIN: f64 = 0.05;
/// Whitespace kept around the drawn content after cropping, in inches.
const CROP_PAD_IN: f32 = 0.1;

const BASEMAP_FILL: Color = Color::hex(0xe8f4e8);
const BASEMAP_EDGE: Color = Color::hex(0x333333);
const BASEMAP_EDGE_PT: f32 = 0.8;
const MARKER_PT: f32 = 6.0;
const TEXT_COLOR: Color = Color::hex(0x000000);
const LABEL_BOX: LabelBox = LabelBox {
    fill: Color::WHITE,
    border: Color::hex(0x666666),
    border_width: 1.0,
    pad: 0.3,
};
const TITLE_PT: f32 = 18.0;
const TITLE_PAD_PT: f32 = 20.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No meteo data provided")]
    EmptyData,

    #[error("Map not found for country: {code}. Available: {available:?}")]
    UnknownCountry { code: String, available: Vec<String> },

    #[error("No forecast days for location: {location}")]
    EmptyForecast { location: String },

    #[error("Failed to read map {}: {source}", .path.display())]
    MapLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse map {}: {source}", .path.display())]
    MapParse {
        path: PathBuf,
        source: BasemapError,
    },

    #[error("embedded font could not be parsed")]
    Font,

    #[error("drawing surface could not be allocated")]
    Surface,

    #[error("PNG encoding failed: {0}")]
    Encode(image::ImageError),

    #[error("Failed to save map to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<CanvasError> for RenderError {
    fn from(err: CanvasError) -> Self {
        match err {
            CanvasError::Font => RenderError::Font,
            CanvasError::Surface => RenderError::Surface,
            CanvasError::Encode(e) => RenderError::Encode(e),
        }
    }
}

/// Per-request rendering options.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Explicit title; wins over the derived one
    pub title: Option<String>,
    /// Forecast day to display, clamped per location
    pub day_index: usize,
    pub variant: MapVariant,
    pub save_to_disk: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            title: None,
            day_index: 0,
            variant: MapVariant::General,
            save_to_disk: true,
        }
    }
}

/// A rendered map and where it was persisted, if it was.
#[derive(Debug)]
pub struct GeneratedMap {
    pub png: Vec<u8>,
    pub saved_path: Option<PathBuf>,
}

/// One location reduced to what gets drawn.
struct PlottedPoint {
    lon: f64,
    lat: f64,
    color: Color,
    label: String,
    font_pt: f32,
    offset_deg: f64,
}

impl PlottedPoint {
    fn new(location: &WeatherLocation, day: &DayValues, variant: MapVariant) -> Self {
        let tier = location.placement_tier();
        Self {
            lon: location.longitude,
            lat: location.latitude,
            color: variant.marker_color(day),
            label: variant.label(location.label_name(), day),
            font_pt: match tier {
                1 => 10.0,
                2 => 9.0,
                _ => 8.0,
            },
            offset_deg: if tier <= 2 { 0.2 } else { 0.15 },
        }
    }
}

/// Renders weather maps against a fixed country catalog.
#[derive(Debug, Clone)]
pub struct WeatherMapService {
    catalog: CountryCatalog,
    output_dir: PathBuf,
    dpi: u32,
}

impl WeatherMapService {
    pub fn new(catalog: CountryCatalog, output_dir: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            catalog,
            output_dir: output_dir.into(),
            dpi,
        }
    }

    pub fn catalog(&self) -> &CountryCatalog {
        &self.catalog
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn available_countries(&self) -> Vec<String> {
        self.catalog.codes()
    }

    /// Render one map of `locations` over the outline of `country_code`.
    pub fn generate_map(
        &self,
        locations: &[WeatherLocation],
        country_code: &str,
        options: &MapOptions,
    ) -> Result<GeneratedMap, RenderError> {
        if locations.is_empty() {
            return Err(RenderError::EmptyData);
        }
        let basemap = self.load_basemap(country_code)?;
        self.render(&basemap, locations, country_code, options, Local::now())
    }

    /// Render and persist the four named variants. Stops at the first failure;
    /// files written before it stay on disk.
    pub fn generate_all_maps(
        &self,
        locations: &[WeatherLocation],
        country_code: &str,
        day_index: usize,
    ) -> Result<BTreeMap<MapVariant, PathBuf>, RenderError> {
        if locations.is_empty() {
            return Err(RenderError::EmptyData);
        }
        let basemap = self.load_basemap(country_code)?;

        let mut generated = BTreeMap::new();
        for variant in MapVariant::NAMED {
            let options = MapOptions {
                title: None,
                day_index,
                variant,
                save_to_disk: true,
            };
            let map = self.render(&basemap, locations, country_code, &options, Local::now())?;
            if let Some(path) = map.saved_path {
                generated.insert(variant, path);
            }
        }
        tracing::info!(
            country = %country_code,
            count = generated.len(),
            "Generated all map variants"
        );
        Ok(generated)
    }

    fn load_basemap(&self, country_code: &str) -> Result<Basemap, RenderError> {
        let path = self
            .catalog
            .resolve(country_code)
            .ok_or_else(|| RenderError::UnknownCountry {
                code: country_code.to_string(),
                available: self.catalog.codes(),
            })?;

        Basemap::load(path).map_err(|err| match err {
            BasemapError::Io(source) => RenderError::MapLoad {
                path: path.to_path_buf(),
                source,
            },
            other => RenderError::MapParse {
                path: path.to_path_buf(),
                source: other,
            },
        })
    }

    fn render(
        &self,
        basemap: &Basemap,
        locations: &[WeatherLocation],
        country_code: &str,
        options: &MapOptions,
        now: DateTime<Local>,
    ) -> Result<GeneratedMap, RenderError> {
        let canvas = self.compose(basemap, locations, options, now)?;
        let png = canvas.into_png(CROP_PAD_IN)?;

        let saved_path = if options.save_to_disk {
            Some(self.persist(&png, country_code, options.variant, now)?)
        } else {
            None
        };
        Ok(GeneratedMap { png, saved_path })
    }

    /// Draw the full figure onto a fresh canvas.
    fn compose(
        &self,
        basemap: &Basemap,
        locations: &[WeatherLocation],
        options: &MapOptions,
        now: DateTime<Local>,
    ) -> Result<Canvas, RenderError> {
        let points = plan_points(locations, options)?;

        let mut canvas = Canvas::new(FIGURE_WIDTH_IN, FIGURE_HEIGHT_IN, self.dpi)?;
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        let area = PixelRect {
            x: width * PLOT_LEFT,
            y: height * (1.0 - PLOT_TOP),
            width: width * (PLOT_RIGHT - PLOT_LEFT),
            height: height * (PLOT_TOP - PLOT_BOTTOM),
        };

        let mut bounds = basemap
            .bounds()
            .unwrap_or_else(|| Bounds::around(points[0].lon, points[0].lat));
        for p in &points {
            bounds.include(p.lon, p.lat);
        }
        let viewport = Viewport::fit(bounds.padded(DATA_MARGIN), area);

        for polygon in &basemap.polygons {
            let rings: Vec<Vec<(f32, f32)>> = std::iter::once(&polygon.exterior)
                .chain(&polygon.holes)
                .map(|ring| ring.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect())
                .collect();
            canvas.fill_polygon(&rings, BASEMAP_FILL);
            for ring in &rings {
                canvas.stroke_ring(ring, BASEMAP_EDGE, BASEMAP_EDGE_PT);
            }
        }

        // Markers sit below every label.
        for p in &points {
            canvas.draw_marker(viewport.project(p.lon, p.lat), MARKER_PT, p.color);
        }
        for p in &points {
            let anchor = viewport.project(p.lon + p.offset_deg, p.lat + p.offset_deg);
            canvas.draw_label(anchor, &p.label, p.font_pt, TEXT_COLOR, LABEL_BOX);
        }

        let date = locations[0].forecast.date(options.day_index);
        let title = map_title(options, date, now);
        let bottom = viewport.top() - canvas.pt(TITLE_PAD_PT);
        canvas.draw_title(&title, TITLE_PT, viewport.center_x(), bottom, TEXT_COLOR);

        Ok(canvas)
    }

    fn persist(
        &self,
        png: &[u8],
        country_code: &str,
        variant: MapVariant,
        now: DateTime<Local>,
    ) -> Result<PathBuf, RenderError> {
        let dir = self
            .output_dir
            .join(country_code.trim().to_lowercase())
            .join(now.format("%Y-%m-%d").to_string());
        let path = dir.join(variant.file_name(now));

        std::fs::create_dir_all(&dir)
            .and_then(|_| std::fs::write(&path, png))
            .map_err(|source| RenderError::Persist {
                path: path.clone(),
                source,
            })?;

        tracing::info!(variant = variant.as_str(), path = %path.display(), "Saved map");
        Ok(path)
    }
}

/// Resolve every location's values for the requested day, in draw order.
fn plan_points(
    locations: &[WeatherLocation],
    options: &MapOptions,
) -> Result<Vec<PlottedPoint>, RenderError> {
    let mut ordered: Vec<&WeatherLocation> = locations.iter().collect();
    // Stable: equal priorities keep input order.
    ordered.sort_by_key(|loc| Reverse(loc.draw_order_key()));

    ordered
        .into_iter()
        .map(|loc| {
            let day = loc
                .forecast
                .day(options.day_index)
                .ok_or_else(|| RenderError::EmptyForecast {
                    location: loc.name.clone(),
                })?;
            Ok(PlottedPoint::new(loc, &day, options.variant))
        })
        .collect()
}

fn map_title(options: &MapOptions, date: Option<&str>, now: DateTime<Local>) -> String {
    if let Some(title) = options.title.as_deref().filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    let date = match date {
        Some(d) => d.to_string(),
        None => now.format("%Y-%m-%d").to_string(),
    };
    format!("{} — {}", options.variant.title_prefix(), date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::basemap::tests::SQUARE_GEOJSON;
    use crate::services::location::tests::{location, single_day};
    use chrono::TimeZone;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    struct Fixture {
        _maps: TempDir,
        output: TempDir,
        service: WeatherMapService,
    }

    fn fixture(dpi: u32) -> Fixture {
        let maps = tempfile::tempdir().unwrap();
        std::fs::write(maps.path().join("dz.geojson"), SQUARE_GEOJSON).unwrap();
        let output = tempfile::tempdir().unwrap();
        let catalog = CountryCatalog::scan(maps.path()).unwrap();
        let service = WeatherMapService::new(catalog, output.path(), dpi);
        Fixture {
            _maps: maps,
            output,
            service,
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 14, 30, 5).unwrap()
    }

    fn options(variant: MapVariant) -> MapOptions {
        MapOptions {
            variant,
            save_to_disk: false,
            ..MapOptions::default()
        }
    }

    fn marker_pixel(
        fx: &Fixture,
        locations: &[WeatherLocation],
        opts: &MapOptions,
    ) -> image::Rgba<u8> {
        let basemap = Basemap::from_geojson_str(SQUARE_GEOJSON).unwrap();
        let canvas = fx.service.compose(&basemap, locations, opts, now()).unwrap();

        // Recompute the viewport the same way compose does.
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let area = PixelRect {
            x: w * PLOT_LEFT,
            y: h * (1.0 - PLOT_TOP),
            width: w * (PLOT_RIGHT - PLOT_LEFT),
            height: h * (PLOT_TOP - PLOT_BOTTOM),
        };
        let viewport = Viewport::fit(basemap.bounds().unwrap().padded(DATA_MARGIN), area);
        canvas.pixel(viewport.project(4.0, 32.0))
    }

    #[test]
    fn test_generate_map_returns_png_and_persists() {
        let fx = fixture(20);
        let locations = vec![location("Algiers", Some(1), single_day(27.0, 15.0, 10.0, Some(20)))];
        let map = fx
            .service
            .generate_map(&locations, "DZ", &MapOptions::default())
            .unwrap();

        assert!(map.png.starts_with(PNG_MAGIC));
        let saved = map.saved_path.unwrap();
        assert!(saved.starts_with(fx.output.path().join("dz")));
        let file_name = saved.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("weather_map_") && file_name.ends_with(".png"));
        assert_eq!(std::fs::read(&saved).unwrap(), map.png);
    }

    #[test]
    fn test_generate_map_without_saving() {
        let fx = fixture(20);
        let locations = vec![location("Algiers", Some(1), single_day(27.0, 15.0, 10.0, None))];
        let map = fx
            .service
            .generate_map(&locations, "dz", &options(MapVariant::Sun))
            .unwrap();
        assert!(map.saved_path.is_none());
        assert_eq!(std::fs::read_dir(fx.output.path()).unwrap().count(), 0);

        let decoded = image::load_from_memory(&map.png).unwrap();
        assert!(decoded.width() > 0 && decoded.width() <= 240);
        assert!(decoded.height() > 0 && decoded.height() <= 220);
    }

    #[test]
    fn test_empty_data_is_rejected() {
        let fx = fixture(20);
        assert!(matches!(
            fx.service.generate_map(&[], "dz", &MapOptions::default()),
            Err(RenderError::EmptyData)
        ));
    }

    #[test]
    fn test_unknown_country_lists_available() {
        let fx = fixture(20);
        let locations = vec![location("Paris", Some(1), single_day(20.0, 10.0, 5.0, None))];
        match fx.service.generate_map(&locations, "fr", &MapOptions::default()) {
            Err(RenderError::UnknownCountry { code, available }) => {
                assert_eq!(code, "fr");
                assert_eq!(available, vec!["dz".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other.map(|m| m.saved_path)),
        }
    }

    #[test]
    fn test_location_without_forecast_days_is_rejected() {
        let fx = fixture(20);
        let locations = vec![location("Empty", Some(1), Default::default())];
        assert!(matches!(
            fx.service.generate_map(&locations, "dz", &MapOptions::default()),
            Err(RenderError::EmptyForecast { .. })
        ));
    }

    #[test]
    fn test_unparseable_map_is_a_parse_error() {
        let fx = fixture(20);
        let maps = tempfile::tempdir().unwrap();
        std::fs::write(maps.path().join("xx.json"), "not json").unwrap();
        let service = WeatherMapService::new(
            CountryCatalog::scan(maps.path()).unwrap(),
            fx.output.path(),
            20,
        );
        let locations = vec![location("A", Some(1), single_day(20.0, 10.0, 5.0, None))];
        assert!(matches!(
            service.generate_map(&locations, "xx", &MapOptions::default()),
            Err(RenderError::MapParse { .. })
        ));
    }

    #[test]
    fn test_most_important_marker_draws_on_top() {
        let fx = fixture(50);
        let hot = location("Capital", Some(1), single_day(30.0, 20.0, 5.0, None));
        let cold = location("Village", Some(3), single_day(10.0, 2.0, 5.0, None));
        let opts = options(MapVariant::MaxTemp);

        let forward = marker_pixel(&fx, &[hot.clone(), cold.clone()], &opts);
        let backward = marker_pixel(&fx, &[cold, hot], &opts);
        assert_eq!(forward, Color::hex(0xff5722).rgba());
        assert_eq!(backward, Color::hex(0xff5722).rgba());
    }

    #[test]
    fn test_equal_priorities_keep_input_order() {
        let fx = fixture(50);
        let hot = location("Blida", Some(2), single_day(30.0, 20.0, 5.0, None));
        let cool = location("Medea", Some(2), single_day(10.0, 2.0, 5.0, None));
        let opts = options(MapVariant::MaxTemp);

        // the later entry is drawn last
        assert_eq!(
            marker_pixel(&fx, &[hot.clone(), cool.clone()], &opts),
            Color::hex(0x2196f3).rgba()
        );
        assert_eq!(
            marker_pixel(&fx, &[cool, hot], &opts),
            Color::hex(0xff5722).rgba()
        );
    }

    #[test]
    fn test_unranked_locations_draw_first() {
        let fx = fixture(50);
        let unranked = location("Unranked", None, single_day(30.0, 20.0, 5.0, None));
        let minor = location("Minor", Some(5), single_day(10.0, 2.0, 5.0, None));
        let opts = options(MapVariant::MaxTemp);
        // priority 5 outranks the implicit 99
        assert_eq!(
            marker_pixel(&fx, &[minor, unranked], &opts),
            Color::hex(0x2196f3).rgba()
        );
    }

    #[test]
    fn test_day_index_beyond_forecast_is_clamped() {
        let fx = fixture(50);
        let json = crate::models::tests::location_json("Algiers", "dz");
        let mut loc = WeatherLocation::from(
            serde_json::from_value::<crate::models::MeteoLocation>(json).unwrap(),
        );
        loc.latitude = 32.0;
        loc.longitude = 4.0;

        let opts = MapOptions {
            day_index: 5,
            ..options(MapVariant::MaxTemp)
        };
        // last day tmax is 22.0
        assert_eq!(
            marker_pixel(&fx, &[loc], &opts),
            Color::hex(0xff9800).rgba()
        );
    }

    #[test]
    fn test_basemap_is_filled() {
        let fx = fixture(50);
        let basemap = Basemap::from_geojson_str(SQUARE_GEOJSON).unwrap();
        let loc = location("A", Some(1), single_day(20.0, 10.0, 5.0, None));
        let canvas = fx
            .service
            .compose(&basemap, &[loc], &options(MapVariant::Wind), now())
            .unwrap();
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let area = PixelRect {
            x: w * PLOT_LEFT,
            y: h * (1.0 - PLOT_TOP),
            width: w * (PLOT_RIGHT - PLOT_LEFT),
            height: h * (PLOT_TOP - PLOT_BOTTOM),
        };
        let viewport = Viewport::fit(basemap.bounds().unwrap().padded(DATA_MARGIN), area);
        assert_eq!(canvas.pixel(viewport.project(1.0, 29.0)), BASEMAP_FILL.rgba());
        assert_eq!(canvas.pixel(viewport.project(-0.3, 32.0)), Color::WHITE.rgba());
    }

    #[test]
    fn test_map_title() {
        let mut opts = options(MapVariant::Wind);
        assert_eq!(map_title(&opts, Some("2026-10-20"), now()), "Wind Speed — 2026-10-20");
        assert_eq!(map_title(&opts, None, now()), "Wind Speed — 2026-10-18");

        opts.title = Some("Custom".to_string());
        assert_eq!(map_title(&opts, Some("2026-10-20"), now()), "Custom");

        opts.title = Some(String::new());
        assert_eq!(map_title(&opts, None, now()), "Wind Speed — 2026-10-18");
    }

    #[test]
    fn test_generate_all_maps_writes_four_files() {
        let fx = fixture(20);
        let locations = vec![
            location("Algiers", Some(1), single_day(27.0, 15.0, 35.0, Some(20))),
            location("Oran", Some(2), single_day(24.0, 12.0, 10.0, Some(70))),
        ];
        let files = fx.service.generate_all_maps(&locations, "dz", 0).unwrap();

        assert_eq!(files.len(), 4);
        for variant in MapVariant::NAMED {
            let path = &files[&variant];
            assert!(path.is_file(), "{}", path.display());
            assert_eq!(
                path.file_name().unwrap().to_str().unwrap(),
                format!("{}.png", variant.as_str())
            );
        }
    }

    #[test]
    fn test_generate_all_maps_aborts_on_failure() {
        let fx = fixture(20);
        // A file where the country directory should be makes every save fail.
        std::fs::write(fx.output.path().join("dz"), b"blocker").unwrap();
        let locations = vec![location("Algiers", Some(1), single_day(27.0, 15.0, 35.0, None))];
        assert!(matches!(
            fx.service.generate_all_maps(&locations, "dz", 0),
            Err(RenderError::Persist { .. })
        ));
    }

    #[test]
    fn test_render_error_messages() {
        assert_eq!(RenderError::EmptyData.to_string(), "No meteo data provided");
        let unknown = RenderError::UnknownCountry {
            code: "FR".to_string(),
            available: vec!["dz".to_string(), "ma".to_string()],
        };
        assert_eq!(
            unknown.to_string(),
            r#"Map not found for country: FR. Available: ["dz", "ma"]"#
        );
    }
}
