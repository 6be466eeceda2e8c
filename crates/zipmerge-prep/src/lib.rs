//! zipmerge-prep: data preparation ahead of the merge
//!
//! Turns the raw product, location and census exports into the cleaned
//! tables the aggregation engine consumes. Each step is a pure transform
//! over in-memory rows plus a thin file wrapper around it.

pub mod category;
pub mod census;
pub mod location;
pub mod product;

pub use category::{CategoryRule, Classifier};
pub use census::{CensusSummary, normalize_census, process_census};
pub use location::{LocationCleanSummary, RawLocation, clean_location_rows, clean_locations};
pub use product::{
    ProductCleanSummary, RawProduct, clean_product_rows, clean_products, pad_location_id,
    parse_size,
};
