//! Pass 2: roll product summaries up to (Location ID, Category, UOM).

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use zipmerge_core::Location;

use crate::keywords::{FALLBACK_KEYWORD, StoreCategoryKey};
use crate::product_summary::ProductSummary;
use crate::stats;

/// Price statistics of one category and unit at one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreCategoryStat {
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "Product Category")]
    pub category: String,
    #[serde(rename = "UOM")]
    pub uom: String,
    #[serde(rename = "Product_Count")]
    pub product_count: usize,
    /// Highest observation count of any product in the group.
    #[serde(rename = "Stock_Observations")]
    pub stock_observations: usize,
    #[serde(rename = "Avg_Price")]
    pub avg_price: Option<f64>,
    #[serde(rename = "Min_Price")]
    pub min_price: Option<f64>,
    #[serde(rename = "Max_Price")]
    pub max_price: Option<f64>,
    #[serde(rename = "Median_Price")]
    pub median_price: Option<f64>,
    #[serde(rename = "Price_Volatility")]
    pub price_volatility: f64,
    #[serde(rename = "Promo_Frequency")]
    pub promo_frequency: f64,
    #[serde(rename = "Keyword_Lists", serialize_with = "crate::output::as_json")]
    pub keywords: Vec<String>,
    /// Filled from the Location table; `None` for unknown stores.
    #[serde(rename = "ZIP Code")]
    pub zip_code: Option<String>,
}

/// Group product summaries by (Location ID, Category, UOM).
///
/// Price statistics are taken over each product's `avg_price`; products
/// without a unit price are counted but contribute no price.
pub fn summarize_stores(products: &[ProductSummary]) -> Vec<StoreCategoryStat> {
    let mut groups: BTreeMap<(&str, &str, &str), Vec<&ProductSummary>> = BTreeMap::new();
    for p in products {
        groups
            .entry((p.location_id.as_str(), p.category.as_str(), p.uom.as_str()))
            .or_default()
            .push(p);
    }

    groups
        .into_iter()
        .map(|((location_id, category, uom), members)| {
            let prices: Vec<f64> = members.iter().filter_map(|p| p.avg_price).collect();
            StoreCategoryStat {
                location_id: location_id.to_string(),
                category: category.to_string(),
                uom: uom.to_string(),
                product_count: members.len(),
                stock_observations: members
                    .iter()
                    .map(|p| p.total_observations)
                    .max()
                    .unwrap_or(0),
                avg_price: stats::mean(prices.iter().copied()),
                min_price: stats::min(prices.iter().copied()),
                max_price: stats::max(prices.iter().copied()),
                median_price: stats::median(&prices),
                price_volatility: stats::mean(members.iter().map(|p| p.price_volatility))
                    .unwrap_or(0.0),
                promo_frequency: stats::mean(members.iter().map(|p| p.promo_frequency))
                    .unwrap_or(0.0),
                keywords: Vec::new(),
                zip_code: None,
            }
        })
        .collect()
}

/// Copy of `stats` with the mined keyword list of each store and category
/// attached to every unit row of that pair.
pub fn attach_keywords(
    stats: &[StoreCategoryStat],
    keywords: &BTreeMap<StoreCategoryKey, Vec<String>>,
) -> Vec<StoreCategoryStat> {
    stats
        .iter()
        .map(|stat| {
            let key = (stat.location_id.clone(), stat.category.clone());
            let keywords = keywords
                .get(&key)
                .cloned()
                .unwrap_or_else(|| vec![FALLBACK_KEYWORD.to_string()]);
            StoreCategoryStat {
                keywords,
                ..stat.clone()
            }
        })
        .collect()
}

/// Copy of `stats` with each ZIP code resolved through the Location table.
///
/// Also returns the number of statistics whose store is unknown.
pub fn assign_zip_codes(
    stats: &[StoreCategoryStat],
    locations: &[Location],
) -> (Vec<StoreCategoryStat>, usize) {
    let mut zip_by_location: FxHashMap<&str, &str> = FxHashMap::default();
    for loc in locations {
        if !loc.zip_code.is_empty() {
            zip_by_location
                .entry(loc.location_id.as_str())
                .or_insert(loc.zip_code.as_str());
        }
    }

    let resolved: Vec<StoreCategoryStat> = stats
        .iter()
        .map(|stat| StoreCategoryStat {
            zip_code: zip_by_location
                .get(stat.location_id.as_str())
                .map(|z| z.to_string()),
            ..stat.clone()
        })
        .collect();
    let unmatched = resolved.iter().filter(|s| s.zip_code.is_none()).count();
    (resolved, unmatched)
}
