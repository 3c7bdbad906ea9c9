//! Country outline loading from GeoJSON.
//!
//! Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
//! Only areal geometries contribute; points and lines are skipped. Output
//! coordinates are always geographic (longitude, latitude in degrees): files
//! declaring the legacy Web Mercator `crs` member are inverse-projected.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::services::canvas::Bounds;

/// WGS84 semi-major axis used by Web Mercator, in metres.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

#[derive(Debug, Error)]
pub enum BasemapError {
    #[error("IO error reading map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map contains no polygons")]
    NoPolygons,
}

/// A ring as a sequence of (longitude, latitude) pairs.
pub type Ring = Vec<(f64, f64)>;

/// One polygon: an exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

/// Country outline polygons in geographic coordinates.
#[derive(Debug, Clone)]
pub struct Basemap {
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceCrs {
    Geographic,
    WebMercator,
}

impl SourceCrs {
    fn from_document(doc: &Value) -> Self {
        let name = doc
            .pointer("/crs/properties/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name.contains("3857") || name.contains("900913") {
            SourceCrs::WebMercator
        } else {
            SourceCrs::Geographic
        }
    }

    fn to_geographic(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            SourceCrs::Geographic => (x, y),
            SourceCrs::WebMercator => {
                let lon = (x / MERCATOR_RADIUS_M).to_degrees();
                let lat = (2.0 * (y / MERCATOR_RADIUS_M).exp().atan()
                    - std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                (lon, lat)
            }
        }
    }
}

// --- GeoJSON document types ---

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
    #[serde(other)]
    Other,
}

impl Basemap {
    pub fn load(path: &Path) -> Result<Self, BasemapError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&raw)
    }

    pub fn from_geojson_str(raw: &str) -> Result<Self, BasemapError> {
        let doc: Value = serde_json::from_str(raw)?;
        let crs = SourceCrs::from_document(&doc);

        let geometries: Vec<Geometry> = match doc.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => serde_json::from_value::<FeatureCollection>(doc)?
                .features
                .into_iter()
                .filter_map(|f| f.geometry)
                .collect(),
            Some("Feature") => serde_json::from_value::<Feature>(doc)?
                .geometry
                .into_iter()
                .collect(),
            _ => vec![serde_json::from_value::<Geometry>(doc)?],
        };

        let mut polygons = Vec::new();
        for geometry in geometries {
            collect_polygons(geometry, crs, &mut polygons);
        }
        if polygons.is_empty() {
            return Err(BasemapError::NoPolygons);
        }
        Ok(Self { polygons })
    }

    /// Bounds of all exterior rings.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self.polygons.iter().flat_map(|p| p.exterior.iter());
        let &(lon, lat) = points.next()?;
        let mut bounds = Bounds::around(lon, lat);
        for &(lon, lat) in points {
            bounds.include(lon, lat);
        }
        Some(bounds)
    }
}

fn collect_polygons(geometry: Geometry, crs: SourceCrs, out: &mut Vec<Polygon>) {
    match geometry {
        Geometry::Polygon { coordinates } => out.extend(to_polygon(coordinates, crs)),
        Geometry::MultiPolygon { coordinates } => {
            out.extend(coordinates.into_iter().filter_map(|p| to_polygon(p, crs)))
        }
        Geometry::GeometryCollection { geometries } => {
            for inner in geometries {
                collect_polygons(inner, crs, out);
            }
        }
        Geometry::Other => {}
    }
}

fn to_polygon(rings: Vec<Vec<Position>>, crs: SourceCrs) -> Option<Polygon> {
    let mut rings = rings.into_iter().map(|ring| to_ring(ring, crs));
    let exterior = rings.next()?;
    if exterior.len() < 3 {
        tracing::warn!("Skipping polygon with degenerate exterior ring");
        return None;
    }
    Some(Polygon {
        exterior,
        holes: rings.filter(|r| r.len() >= 3).collect(),
    })
}

fn to_ring(positions: Vec<Position>, crs: SourceCrs) -> Ring {
    positions
        .into_iter()
        .filter_map(|pos| match pos.as_slice() {
            [x, y, ..] => Some(crs.to_geographic(*x, *y)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Square outline from (0, 28) to (8, 36).
    pub(crate) const SQUARE_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "Testland" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0, 28], [8, 28], [8, 36], [0, 36], [0, 28]]]
      }
    }
  ]
}"#;

    #[test]
    fn test_feature_collection() {
        let map = Basemap::from_geojson_str(SQUARE_GEOJSON).unwrap();
        assert_eq!(map.polygons.len(), 1);
        assert_eq!(map.polygons[0].exterior.len(), 5);
        let b = map.bounds().unwrap();
        assert_eq!((b.min_lon, b.min_lat, b.max_lon, b.max_lat), (0.0, 28.0, 8.0, 36.0));
    }

    #[test]
    fn test_multipolygon_with_hole_and_points_skipped() {
        let raw = r#"{
          "type": "FeatureCollection",
          "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 1]}},
            {"type": "Feature", "geometry": null},
            {"type": "Feature", "geometry": {
              "type": "MultiPolygon",
              "coordinates": [
                [[[0,0],[4,0],[4,4],[0,4],[0,0]], [[1,1],[2,1],[2,2],[1,1]]],
                [[[10,10],[11,10],[11,11],[10,10]]]
              ]
            }}
          ]
        }"#;
        let map = Basemap::from_geojson_str(raw).unwrap();
        assert_eq!(map.polygons.len(), 2);
        assert_eq!(map.polygons[0].holes.len(), 1);
        assert_eq!(map.bounds().unwrap().max_lon, 11.0);
    }

    #[test]
    fn test_bare_geometry_and_single_feature() {
        let bare = r#"{"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}"#;
        assert_eq!(Basemap::from_geojson_str(bare).unwrap().polygons.len(), 1);

        let feature = r#"{"type": "Feature", "properties": {},
            "geometry": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]},
                {"type": "LineString", "coordinates": [[0,0],[1,1]]}
            ]}}"#;
        assert_eq!(Basemap::from_geojson_str(feature).unwrap().polygons.len(), 1);
    }

    #[test]
    fn test_web_mercator_is_reprojected() {
        let raw = r#"{
          "type": "FeatureCollection",
          "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
          "features": [{"type": "Feature", "geometry": {"type": "Polygon",
            "coordinates": [[[0, 0], [1113194.9079, 0], [1113194.9079, 1118889.9748], [0, 0]]]}}]
        }"#;
        let map = Basemap::from_geojson_str(raw).unwrap();
        let (lon, lat) = map.polygons[0].exterior[2];
        assert!((lon - 10.0).abs() < 1e-3, "lon {}", lon);
        assert!((lat - 10.0).abs() < 1e-3, "lat {}", lat);
    }

    #[test]
    fn test_no_polygons_is_an_error() {
        let raw = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 1]}}]}"#;
        assert!(matches!(
            Basemap::from_geojson_str(raw),
            Err(BasemapError::NoPolygons)
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Basemap::from_geojson_str("{"),
            Err(BasemapError::Json(_))
        ));
    }
}
