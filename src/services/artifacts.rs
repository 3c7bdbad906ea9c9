//! Listing of persisted map images under the output root.
//!
//! Layout is `<root>/<country>/<date>/<file>.png`; anything else is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::round_2dp;

/// One persisted image.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ArtifactFile {
    pub name: String,
    /// Download URL under the static mount
    pub url: String,
    pub size_kb: f64,
}

/// Images grouped by country, then by generation date.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ArtifactListing {
    pub countries: BTreeMap<String, BTreeMap<String, Vec<ArtifactFile>>>,
    pub total_files: usize,
}

/// Walk `root` and collect every `<country>/<date>/*.png`.
///
/// A missing root yields an empty listing. Dates without images are left out;
/// country directories are listed even when empty.
pub fn list_artifacts(root: &Path) -> std::io::Result<ArtifactListing> {
    let mut listing = ArtifactListing::default();
    if !root.is_dir() {
        return Ok(listing);
    }

    for country_dir in subdirectories(root)? {
        let Some(country) = dir_name(&country_dir) else {
            continue;
        };
        let dates = listing.countries.entry(country.clone()).or_default();

        for date_dir in subdirectories(&country_dir)? {
            let Some(date) = dir_name(&date_dir) else {
                continue;
            };
            let files = png_files(&date_dir, &country, &date)?;
            if !files.is_empty() {
                listing.total_files += files.len();
                dates.insert(date, files);
            }
        }
    }
    Ok(listing)
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()?.to_str().map(str::to_string)
}

fn png_files(dir: &Path, country: &str, date: &str) -> std::io::Result<Vec<ArtifactFile>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !path.extension().is_some_and(|ext| ext == "png") {
            continue;
        }
        let Some(name) = dir_name(&path) else {
            tracing::warn!("Skipping artifact with non UTF-8 name: {}", path.display());
            continue;
        };
        let size = entry.metadata()?.len();
        files.push(ArtifactFile {
            url: format!("/meteo/{}/{}/{}", country, date, name),
            name,
            size_kb: round_2dp(size as f64 / 1024.0),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, bytes: usize) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let listing = list_artifacts(&dir.path().join("absent")).unwrap();
        assert!(listing.countries.is_empty());
        assert_eq!(listing.total_files, 0);
    }

    #[test]
    fn test_groups_by_country_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "dz/2026-10-18/wind.png", 2048);
        write(root, "dz/2026-10-18/maxtemp.png", 1000);
        write(root, "dz/2026-10-18/notes.txt", 10);
        write(root, "dz/2026-10-17/readme.md", 10);
        write(root, "ma/2026-10-18/sun.png", 512);
        write(root, "stray.png", 10);
        std::fs::create_dir_all(root.join("tn")).unwrap();

        let listing = list_artifacts(root).unwrap();
        assert_eq!(listing.total_files, 3);

        let dz = &listing.countries["dz"];
        assert_eq!(dz.len(), 1, "dates without images are omitted");
        let files = &dz["2026-10-18"];
        assert_eq!(files[0].name, "maxtemp.png");
        assert_eq!(files[0].size_kb, 0.98);
        assert_eq!(files[1].name, "wind.png");
        assert_eq!(files[1].size_kb, 2.0);
        assert_eq!(files[1].url, "/meteo/dz/2026-10-18/wind.png");

        assert_eq!(listing.countries["ma"]["2026-10-18"][0].size_kb, 0.5);
        assert!(listing.countries["tn"].is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "dz/2026-10-18/sun.png", 1024);
        let json = serde_json::to_value(list_artifacts(dir.path()).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "countries": {"dz": {"2026-10-18": [
                    {"name": "sun.png", "url": "/meteo/dz/2026-10-18/sun.png", "size_kb": 1.0}
                ]}},
                "total_files": 1
            })
        );
    }
}
