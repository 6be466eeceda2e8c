//! Location cleaning: geocoded store export → Location table
//!
//! Geocoding itself happens upstream; rows it could not resolve (no ZIP or
//! no coordinates) are skipped here.

use std::path::Path;

use anyhow::Result;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use zipmerge_core::model::parse_number;
use zipmerge_core::{Location, fmt_num, read_records, write_records};

use crate::product::pad_location_id;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLocation {
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "Chain Name")]
    pub chain_name: String,
    #[serde(rename = "ZIP Code")]
    pub zip_code: String,
    #[serde(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    pub longitude: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationCleanSummary {
    pub raw_rows: usize,
    pub ungeocoded: usize,
    pub duplicates_dropped: usize,
    pub cleaned_rows: usize,
}

pub fn clean_location_rows(
    raw: Vec<RawLocation>,
    id_width: usize,
) -> (Vec<Location>, LocationCleanSummary) {
    let mut summary = LocationCleanSummary {
        raw_rows: raw.len(),
        ..Default::default()
    };
    let mut seen = FxHashSet::default();
    let mut cleaned = Vec::with_capacity(raw.len());

    for r in raw {
        let location_id = pad_location_id(&r.location_id, id_width);
        let zip_code = r.zip_code.trim().to_string();
        let (Some(latitude), Some(longitude)) =
            (parse_number(&r.latitude), parse_number(&r.longitude))
        else {
            log::debug!("Location {location_id} has no coordinates, skipping");
            summary.ungeocoded += 1;
            continue;
        };
        if zip_code.is_empty() {
            log::debug!("Location {location_id} has no ZIP code, skipping");
            summary.ungeocoded += 1;
            continue;
        }
        if !seen.insert(location_id.clone()) {
            summary.duplicates_dropped += 1;
            continue;
        }
        cleaned.push(Location {
            location_id,
            zip_code,
            chain_name: r.chain_name.trim().to_string(),
            latitude: Some(latitude),
            longitude: Some(longitude),
        });
    }

    summary.cleaned_rows = cleaned.len();
    (cleaned, summary)
}

/// Clean the geocoded location export and write the Location table.
pub fn clean_locations(
    raw_path: &Path,
    out_path: &Path,
    id_width: usize,
) -> Result<LocationCleanSummary> {
    let raw: Vec<RawLocation> = read_records("raw location", raw_path)?;
    let (cleaned, summary) = clean_location_rows(raw, id_width);
    if summary.ungeocoded > 0 {
        log::warn!(
            "{} locations lack a ZIP code or coordinates and were skipped",
            fmt_num(summary.ungeocoded)
        );
    }
    write_records(out_path, &cleaned)?;
    log::info!(
        "Cleaned location data saved to {} ({} stores)",
        out_path.display(),
        fmt_num(summary.cleaned_rows)
    );
    Ok(summary)
}
