//! zipmerge-aggregate: ZIP-level aggregation and merge engine
//!
//! Turns product observations, store locations and per-ZIP demographics
//! into one row per (ZIP, product category):
//!
//! ```text
//! observations ─► product summary ─► store × category ─► ZIP × category ─┐
//!                       └─► keyword lists ──────┘             └─► keyword freq ─┤
//! locations ───► location summary ──────────────────────────────────────────────┼─► final
//! demographics, boundaries (optional) ──────────────────────────────────────────┘
//! ```
//!
//! Every stage is a pure function over borrowed tables; only [`run`] touches
//! the filesystem.

pub mod boundary;
mod config;
pub mod keywords;
pub mod location_summary;
pub mod merge;
pub mod output;
pub mod product_summary;
pub mod stats;
pub mod store_category;
pub mod zip_keywords;
pub mod zip_rollup;

pub use boundary::{BoundaryTable, load_boundaries};
pub use config::AggregateConfig;
pub use keywords::KeywordMiner;
pub use location_summary::{LocationSummary, summarize_locations};
pub use merge::{FinalRow, FinalTable, MergeInputs, MergeSummary, merge};
pub use output::OutputFormat;
pub use product_summary::{ProductSummary, summarize_products};
pub use store_category::{StoreCategoryStat, assign_zip_codes, attach_keywords, summarize_stores};
pub use zip_keywords::{KeywordFrequency, zip_keyword_frequency};
pub use zip_rollup::{ZipCategoryKey, ZipRollup, rollup_by_zip};

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use zipmerge_core::{
    DemographicTable, Location, ProductObservation, fmt_num, read_raw, read_records,
};

/// Every table derived from the product and location inputs.
#[derive(Debug, Clone, Default)]
pub struct DerivedTables {
    pub products: Vec<ProductSummary>,
    pub stores: Vec<StoreCategoryStat>,
    pub rollups: Vec<ZipRollup>,
    pub keywords: BTreeMap<ZipCategoryKey, KeywordFrequency>,
    pub locations: Vec<LocationSummary>,
    /// Store statistics whose Location ID is not in the location table.
    pub unmatched_stores: usize,
}

/// Run all product and location stages in order.
pub fn derive_tables(
    observations: &[ProductObservation],
    locations: &[Location],
    miner: &KeywordMiner,
) -> DerivedTables {
    let products = summarize_products(observations);
    log::info!(
        "Product summary: {} product-locations from {} observations",
        fmt_num(products.len()),
        fmt_num(observations.len())
    );

    let tagged = attach_keywords(&summarize_stores(&products), &miner.mine(&products));
    let (stores, unmatched_stores) = assign_zip_codes(&tagged, locations);
    if unmatched_stores > 0 {
        log::info!(
            "{} store-category rows have no known location, excluded from ZIP rollup",
            fmt_num(unmatched_stores)
        );
    }
    log::info!("Store summary: {} store-category rows", fmt_num(stores.len()));

    let rollups = rollup_by_zip(&stores);
    let keywords = zip_keyword_frequency(&rollups, &stores);
    log::info!("ZIP rollup: {} ZIP-category rows", fmt_num(rollups.len()));

    let locations = summarize_locations(locations);
    log::info!("Location summary: {} ZIP codes", fmt_num(locations.len()));

    DerivedTables {
        products,
        stores,
        rollups,
        keywords,
        locations,
        unmatched_stores,
    }
}

/// Summary statistics from one engine run.
#[derive(Debug, Clone, Default)]
pub struct AggregateSummary {
    pub observations: usize,
    pub stores: usize,
    pub demographic_zips: usize,
    pub boundary_zips: Option<usize>,
    pub product_summaries: usize,
    pub zip_categories: usize,
    pub location_zips: usize,
    pub merge: MergeSummary,
}

/// Load every input, run the engine and write the final dataset.
///
/// Fails fast on a missing required input; the boundary file is optional.
pub fn run(config: &AggregateConfig) -> Result<AggregateSummary> {
    // Demographics first: a missing census file is the most common mistake.
    let demographic_raw = read_raw("demographic", &config.demographic_path)?;
    let demographics = DemographicTable::from_raw(&demographic_raw)
        .with_context(|| format!("Invalid demographic table: {}", config.demographic_path.display()))?;
    let locations: Vec<Location> = read_records("location", &config.location_path)?;
    let observations: Vec<ProductObservation> = read_records("product", &config.product_path)?;
    let boundaries = load_boundaries(config.boundary_path.as_deref())?;

    let miner = KeywordMiner::new(&config.excluded_keywords);
    let tables = derive_tables(&observations, &locations, &miner);

    let (final_table, merge_summary) = merge(&MergeInputs {
        locations: &tables.locations,
        demographics: &demographics,
        boundaries: boundaries.as_ref(),
        rollups: &tables.rollups,
        keywords: &tables.keywords,
    });
    log::info!(
        "Merged {} rows, dropped {} incomplete, kept {}",
        fmt_num(merge_summary.joined_rows),
        fmt_num(merge_summary.dropped_incomplete),
        fmt_num(merge_summary.output_rows)
    );
    if final_table.rows.is_empty() {
        log::warn!("Final dataset is empty");
    }

    output::write_final(
        &config.output_path,
        &final_table,
        config.format,
        config.compression_level,
    )?;
    if let Some(dir) = &config.intermediate_dir {
        output::write_intermediate(dir, &tables)?;
        log::info!("Wrote intermediate tables to {}", dir.display());
    }

    Ok(AggregateSummary {
        observations: observations.len(),
        stores: locations.len(),
        demographic_zips: demographics.len(),
        boundary_zips: boundaries.as_ref().map(BoundaryTable::len),
        product_summaries: tables.products.len(),
        zip_categories: tables.rollups.len(),
        location_zips: tables.locations.len(),
        merge: merge_summary,
    })
}
