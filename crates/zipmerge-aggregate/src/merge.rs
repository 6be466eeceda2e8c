//! Final merge: ZIP-level location, demographic and boundary data joined
//! with the ZIP × category product rollup.
//!
//! Join order:
//! 1. Location Summary ⟕ Demographic ⟕ Boundary (optional), on ZIP
//! 2. ZIP Rollup ⟕ ZIP Keyword Frequency, on (ZIP, Category)
//! 3. (1) ⟕ (2), on ZIP
//!
//! Any joined row with a missing value is dropped, not imputed.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use zipmerge_core::{DemographicRecord, DemographicTable};

use crate::boundary::BoundaryTable;
use crate::location_summary::LocationSummary;
use crate::zip_keywords::KeywordFrequency;
use crate::zip_rollup::{ZipCategoryKey, ZipRollup};

/// One complete (ZIP, Category) row of the output dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalRow {
    pub zip_code: String,
    pub store_count: usize,
    pub chain_distribution: BTreeMap<String, u64>,
    pub avg_latitude: f64,
    pub avg_longitude: f64,
    /// Values for [`FinalTable::demographic_columns`], same order.
    pub demographics: Vec<f64>,
    /// Present exactly when the table carries a geometry column.
    pub geometry: Option<String>,
    pub category: String,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub median_price: f64,
    pub price_volatility: f64,
    pub promo_frequency: f64,
    pub avg_product_count: f64,
    pub keyword_frequency: KeywordFrequency,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalTable {
    pub demographic_columns: Vec<String>,
    pub has_geometry: bool,
    pub rows: Vec<FinalRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Rows produced by the left joins before the completeness filter.
    pub joined_rows: usize,
    pub dropped_incomplete: usize,
    pub output_rows: usize,
}

/// Inputs of the final merge. All tables are borrowed, none is modified.
pub struct MergeInputs<'a> {
    pub locations: &'a [LocationSummary],
    pub demographics: &'a DemographicTable,
    pub boundaries: Option<&'a BoundaryTable>,
    pub rollups: &'a [ZipRollup],
    pub keywords: &'a BTreeMap<ZipCategoryKey, KeywordFrequency>,
}

/// The ZIP-level half of the join (step 1).
struct ZipContext<'a> {
    summary: &'a LocationSummary,
    demographics: Option<&'a DemographicRecord>,
    geometry: Option<Option<&'a str>>,
}

/// Build one output row, or `None` if any joined field is missing.
fn complete_row(
    zip: &ZipContext<'_>,
    rollup: Option<&ZipRollup>,
    keywords: Option<&KeywordFrequency>,
) -> Option<FinalRow> {
    let rollup = rollup?;
    let demographics = zip
        .demographics?
        .values
        .iter()
        .copied()
        .collect::<Option<Vec<f64>>>()?;
    let geometry = match zip.geometry {
        None => None,
        Some(geom) => Some(geom?.to_string()),
    };

    Some(FinalRow {
        zip_code: zip.summary.zip_code.clone(),
        store_count: zip.summary.store_count,
        chain_distribution: zip.summary.chain_distribution.clone(),
        avg_latitude: zip.summary.avg_latitude?,
        avg_longitude: zip.summary.avg_longitude?,
        demographics,
        geometry,
        category: rollup.category.clone(),
        avg_price: rollup.avg_price?,
        min_price: rollup.min_price?,
        max_price: rollup.max_price?,
        median_price: rollup.median_price?,
        price_volatility: rollup.price_volatility,
        promo_frequency: rollup.promo_frequency,
        avg_product_count: rollup.avg_product_count,
        keyword_frequency: keywords.cloned().unwrap_or_default(),
    })
}

/// Join all ZIP-level streams and keep only complete rows.
///
/// Output is ordered by ZIP (location summary order), then category.
pub fn merge(inputs: &MergeInputs<'_>) -> (FinalTable, MergeSummary) {
    let demographics_by_zip: FxHashMap<&str, &DemographicRecord> = inputs
        .demographics
        .records
        .iter()
        .map(|r| (r.zip_code.as_str(), r))
        .collect();

    let mut rollups_by_zip: BTreeMap<&str, Vec<&ZipRollup>> = BTreeMap::new();
    for r in inputs.rollups {
        rollups_by_zip.entry(r.zip_code.as_str()).or_default().push(r);
    }

    let mut summary = MergeSummary::default();
    let mut rows = Vec::new();

    for loc in inputs.locations {
        let zip = ZipContext {
            summary: loc,
            demographics: demographics_by_zip.get(loc.zip_code.as_str()).copied(),
            geometry: inputs.boundaries.map(|b| b.get(&loc.zip_code)),
        };

        let products = rollups_by_zip
            .get(loc.zip_code.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        if products.is_empty() {
            // Left join keeps the ZIP with empty product fields.
            summary.joined_rows += 1;
            summary.dropped_incomplete += 1;
            log::debug!("ZIP {} has no product data, dropped", loc.zip_code);
            continue;
        }

        for &rollup in products {
            summary.joined_rows += 1;
            let keywords = inputs.keywords.get(&rollup.key());
            match complete_row(&zip, Some(rollup), keywords) {
                Some(row) => rows.push(row),
                None => {
                    summary.dropped_incomplete += 1;
                    log::debug!(
                        "ZIP {} / {} has missing values, dropped",
                        loc.zip_code,
                        rollup.category
                    );
                }
            }
        }
    }

    summary.output_rows = rows.len();
    let table = FinalTable {
        demographic_columns: inputs.demographics.columns.clone(),
        has_geometry: inputs.boundaries.is_some(),
        rows,
    };
    (table, summary)
}
