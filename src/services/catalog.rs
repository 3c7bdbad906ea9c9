//! Country code → outline file lookup, built once at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read-only index of country outline files, keyed by lowercase code.
#[derive(Debug, Clone, Default)]
pub struct CountryCatalog {
    maps: BTreeMap<String, PathBuf>,
}

impl CountryCatalog {
    /// Scan `dir` for `<code>.json` / `<code>.geojson` files.
    ///
    /// A missing directory is created and yields an empty catalog.
    pub fn scan(dir: &Path) -> std::io::Result<Self> {
        let mut maps = BTreeMap::new();
        if !dir.exists() {
            tracing::warn!("Maps directory does not exist, creating: {}", dir.display());
            std::fs::create_dir_all(dir)?;
            return Ok(Self { maps });
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_outline_file(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("Skipping map file with non UTF-8 name: {}", path.display());
                continue;
            };
            let code = stem.to_lowercase();
            tracing::info!("Loaded map for {}: {}", code, path.display());
            if let Some(previous) = maps.insert(code.clone(), path) {
                tracing::warn!(
                    "Duplicate map for {}; {} is shadowed",
                    code,
                    previous.display()
                );
            }
        }

        Ok(Self { maps })
    }

    /// Supported codes, sorted.
    pub fn codes(&self) -> Vec<String> {
        self.maps.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Outline file for `code`, matched case-insensitively.
    pub fn resolve(&self, code: &str) -> Option<&Path> {
        self.maps
            .get(&code.trim().to_lowercase())
            .map(PathBuf::as_path)
    }
}

fn is_outline_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("geojson"))
}
