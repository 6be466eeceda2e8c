//! Optional ZIP boundary geometry.
//!
//! Accepts a GeoJSON FeatureCollection (ZCTA shapes) or a CSV with a ZIP
//! column and a `geometry` column. Geometry is carried as opaque text and
//! only joined, never interpreted.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use zipmerge_core::model::ZIP_COLUMN;
use zipmerge_core::{InputError, fmt_num, read_raw};

/// Feature properties that may hold the ZIP code, in lookup order.
const ZIP_PROPERTIES: [&str; 4] = ["ZCTA5CE20", "ZCTA5CE10", "GEOID20", ZIP_COLUMN];

const GEOMETRY_COLUMN: &str = "geometry";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryTable {
    geometry: BTreeMap<String, String>,
}

impl BoundaryTable {
    pub fn get(&self, zip_code: &str) -> Option<&str> {
        self.geometry.get(zip_code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}

impl FromIterator<(String, String)> for BoundaryTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut geometry = BTreeMap::new();
        for (zip, geom) in iter {
            geometry.entry(zip).or_insert(geom);
        }
        Self { geometry }
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    geometry: Option<Value>,
}

/// ZIP code of a feature. Numeric codes lose their leading zeros in
/// GeoJSON, so they are padded back to five digits.
fn feature_zip(properties: &serde_json::Map<String, Value>) -> Option<String> {
    ZIP_PROPERTIES.iter().find_map(|key| match properties.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n.as_u64().map(|zip| format!("{zip:05}")),
        _ => None,
    })
}

/// Parse a GeoJSON FeatureCollection into ZIP → compact geometry JSON.
pub fn parse_geojson(text: &str) -> Result<BoundaryTable> {
    let collection: FeatureCollection =
        serde_json::from_str(text).context("Invalid GeoJSON FeatureCollection")?;
    let mut pairs = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let (Some(zip), Some(geometry)) = (feature_zip(&feature.properties), feature.geometry)
        else {
            continue;
        };
        if geometry.is_null() {
            continue;
        }
        pairs.push((zip, serde_json::to_string(&geometry)?));
    }
    Ok(pairs.into_iter().collect())
}

fn load_csv(path: &Path) -> Result<BoundaryTable> {
    let raw = read_raw("boundary", path)?;
    let zip_idx = ZIP_PROPERTIES
        .iter()
        .find_map(|c| raw.column_index(c))
        .ok_or_else(|| InputError::MissingColumn {
            table: "boundary",
            column: ZIP_COLUMN.to_string(),
        })?;
    let geom_idx = raw
        .column_index(GEOMETRY_COLUMN)
        .ok_or_else(|| InputError::MissingColumn {
            table: "boundary",
            column: GEOMETRY_COLUMN.to_string(),
        })?;

    Ok(raw
        .rows
        .iter()
        .filter_map(|row| {
            let zip = row.get(zip_idx)?.trim();
            let geom = row.get(geom_idx)?.trim();
            (!zip.is_empty() && !geom.is_empty()).then(|| (zip.to_string(), geom.to_string()))
        })
        .collect())
}

/// Load boundary geometry if configured and present.
///
/// A missing file is not an error: the merge then runs without the
/// geometry column.
pub fn load_boundaries(path: Option<&Path>) -> Result<Option<BoundaryTable>> {
    let Some(path) = path else {
        log::debug!("No boundary file configured");
        return Ok(None);
    };
    if !path.is_file() {
        log::warn!(
            "Boundary file not found at {}, skipping ZIP boundary integration",
            path.display()
        );
        return Ok(None);
    }

    let table = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
        load_csv(path)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read boundary file: {}", path.display()))?;
        parse_geojson(&text).with_context(|| format!("Failed to parse {}", path.display()))?
    };

    log::info!(
        "Loaded {} ZIP boundaries from {}",
        fmt_num(table.len()),
        path.display()
    );
    Ok(Some(table))
}
