//! ZIP-level rollup of store-category statistics.
//!
//! Blends per-store figures: means of means, min of mins, max of maxes and
//! a mean of medians. These are not statistics over the raw observations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::stats;
use crate::store_category::StoreCategoryStat;

/// (ZIP Code, Product Category)
pub type ZipCategoryKey = (String, String);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZipRollup {
    #[serde(rename = "ZIP Code")]
    pub zip_code: String,
    #[serde(rename = "Product Category")]
    pub category: String,
    #[serde(rename = "Avg_Price")]
    pub avg_price: Option<f64>,
    #[serde(rename = "Min_Price")]
    pub min_price: Option<f64>,
    #[serde(rename = "Max_Price")]
    pub max_price: Option<f64>,
    /// Mean of per-store medians.
    #[serde(rename = "Median_Price")]
    pub median_price: Option<f64>,
    #[serde(rename = "Price_Volatility")]
    pub price_volatility: f64,
    #[serde(rename = "Promo_Frequency")]
    pub promo_frequency: f64,
    #[serde(rename = "Avg_Product_Count")]
    pub avg_product_count: f64,
}

impl ZipRollup {
    pub fn key(&self) -> ZipCategoryKey {
        (self.zip_code.clone(), self.category.clone())
    }
}

/// Group statistics that have a ZIP code by (ZIP Code, Category).
pub fn rollup_by_zip(stats: &[StoreCategoryStat]) -> Vec<ZipRollup> {
    let mut groups: BTreeMap<(&str, &str), Vec<&StoreCategoryStat>> = BTreeMap::new();
    for s in stats {
        if let Some(zip) = s.zip_code.as_deref() {
            groups
                .entry((zip, s.category.as_str()))
                .or_default()
                .push(s);
        }
    }

    groups
        .into_iter()
        .map(|((zip_code, category), members)| ZipRollup {
            zip_code: zip_code.to_string(),
            category: category.to_string(),
            avg_price: stats::mean(members.iter().filter_map(|s| s.avg_price)),
            min_price: stats::min(members.iter().filter_map(|s| s.min_price)),
            max_price: stats::max(members.iter().filter_map(|s| s.max_price)),
            median_price: stats::mean(members.iter().filter_map(|s| s.median_price)),
            price_volatility: stats::mean(members.iter().map(|s| s.price_volatility))
                .unwrap_or(0.0),
            promo_frequency: stats::mean(members.iter().map(|s| s.promo_frequency))
                .unwrap_or(0.0),
            avg_product_count: stats::mean(members.iter().map(|s| s.product_count as f64))
                .unwrap_or(0.0),
        })
        .collect()
}
