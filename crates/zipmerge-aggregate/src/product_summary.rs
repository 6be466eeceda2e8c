//! Pass 1: collapse repeated observations of one product at one store.
//!
//! Group key: (Product ID, Location ID, Quantity, UOM, Brand, Category,
//! Description). Output is sorted by that key.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::Serialize;

use zipmerge_core::ProductObservation;

use crate::stats;

/// Price history of one product at one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    #[serde(rename = "Product ID")]
    pub product_id: String,
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "Quantity")]
    pub quantity: f64,
    #[serde(rename = "UOM")]
    pub uom: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Product Category")]
    pub category: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// Raw `Date Retrieved` of the observation picked as most recent.
    #[serde(rename = "Most_Recent_Date")]
    pub most_recent_date: String,
    /// Unit price at the most recent observation; 0 when it has none.
    #[serde(rename = "Most_Recent_Price")]
    pub most_recent_price: f64,
    /// Mean unit price; `None` when no observation has a unit price.
    #[serde(rename = "Avg_Price")]
    pub avg_price: Option<f64>,
    /// Mean promo unit price over promo observations; 0 when there are none.
    #[serde(rename = "Promo_Price_Avg")]
    pub promo_price_avg: f64,
    /// Sample std-dev of unit price; 0 below two priced observations.
    #[serde(rename = "Price_Volatility")]
    pub price_volatility: f64,
    #[serde(rename = "Promo_Observations")]
    pub promo_observations: usize,
    #[serde(rename = "Total_Observations")]
    pub total_observations: usize,
    /// `promo_observations / total_observations`, two decimals.
    #[serde(rename = "Promo_Frequency")]
    pub promo_frequency: f64,
}

type GroupKey<'a> = (&'a str, &'a str, u64, &'a str, &'a str, &'a str, &'a str);

fn group_key(o: &ProductObservation) -> GroupKey<'_> {
    (
        o.product_id.as_str(),
        o.location_id.as_str(),
        // -0.0 and 0.0 are the same quantity
        (o.quantity + 0.0).to_bits(),
        o.uom.as_str(),
        o.brand.as_str(),
        o.category.as_str(),
        o.description.as_str(),
    )
}

/// Ordering used to pick the most recent observation of a group.
///
/// Latest retrieval date wins; equal dates fall back to the higher unit
/// price, so the choice does not depend on input row order.
fn recency(a: &ProductObservation, b: &ProductObservation) -> Ordering {
    a.retrieved_at()
        .cmp(&b.retrieved_at())
        .then_with(|| stats::cmp_opt(a.price_per_unit(), b.price_per_unit()))
}

fn summarize_group(obs: &[&ProductObservation]) -> Option<ProductSummary> {
    let first = obs.first()?;
    let latest = obs.iter().copied().max_by(|a, b| recency(a, b))?;

    let unit_prices: Vec<f64> = obs.iter().filter_map(|o| o.price_per_unit()).collect();
    let promo_unit_prices = obs
        .iter()
        .filter(|o| o.has_promo())
        .filter_map(|o| o.promo_price_per_unit());
    let promo_observations = obs.iter().filter(|o| o.has_promo()).count();
    let total_observations = obs.len();

    let promo_frequency = if total_observations == 0 {
        0.0
    } else {
        stats::round_to(promo_observations as f64 / total_observations as f64, 2)
    };

    Some(ProductSummary {
        product_id: first.product_id.clone(),
        location_id: first.location_id.clone(),
        quantity: first.quantity,
        uom: first.uom.clone(),
        brand: first.brand.clone(),
        category: first.category.clone(),
        description: first.description.clone(),
        most_recent_date: latest.date_retrieved.clone(),
        most_recent_price: latest.price_per_unit().unwrap_or(0.0),
        avg_price: stats::mean(unit_prices.iter().copied()),
        promo_price_avg: stats::mean(promo_unit_prices).unwrap_or(0.0),
        price_volatility: stats::sample_std(&unit_prices).unwrap_or(0.0),
        promo_observations,
        total_observations,
        promo_frequency,
    })
}

fn key_order(a: &ProductSummary, b: &ProductSummary) -> Ordering {
    a.product_id
        .cmp(&b.product_id)
        .then_with(|| a.location_id.cmp(&b.location_id))
        .then_with(|| a.quantity.total_cmp(&b.quantity))
        .then_with(|| a.uom.cmp(&b.uom))
        .then_with(|| a.brand.cmp(&b.brand))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.description.cmp(&b.description))
}

/// Summarize every product-at-store group. One output row per group.
pub fn summarize_products(observations: &[ProductObservation]) -> Vec<ProductSummary> {
    let mut index: FxHashMap<GroupKey<'_>, usize> = FxHashMap::default();
    let mut groups: Vec<Vec<&ProductObservation>> = Vec::new();

    for o in observations {
        let slot = *index.entry(group_key(o)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(o);
    }

    let mut summaries: Vec<ProductSummary> =
        groups.iter().filter_map(|g| summarize_group(g)).collect();
    summaries.sort_by(key_order);
    summaries
}
