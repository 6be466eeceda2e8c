//! Store presence per ZIP code, built from the Location table alone.

use std::collections::BTreeMap;

use serde::Serialize;

use zipmerge_core::Location;

use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSummary {
    #[serde(rename = "ZIP Code")]
    pub zip_code: String,
    #[serde(rename = "Store_Count")]
    pub store_count: usize,
    /// Chain name → number of stores of that chain in the ZIP.
    #[serde(rename = "Store_Chain_Distribution", serialize_with = "crate::output::as_json")]
    pub chain_distribution: BTreeMap<String, u64>,
    #[serde(rename = "Avg_Latitude")]
    pub avg_latitude: Option<f64>,
    #[serde(rename = "Avg_Longitude")]
    pub avg_longitude: Option<f64>,
}

/// Summarize locations by ZIP code, ordered by ZIP.
///
/// Locations without a ZIP code are skipped. Stores without a chain name
/// count toward `store_count` but not the chain distribution.
pub fn summarize_locations(locations: &[Location]) -> Vec<LocationSummary> {
    let mut groups: BTreeMap<&str, Vec<&Location>> = BTreeMap::new();
    for loc in locations {
        if !loc.zip_code.is_empty() {
            groups.entry(loc.zip_code.as_str()).or_default().push(loc);
        }
    }

    groups
        .into_iter()
        .map(|(zip_code, stores)| {
            let mut chain_distribution: BTreeMap<String, u64> = BTreeMap::new();
            for s in stores.iter().filter(|s| !s.chain_name.is_empty()) {
                *chain_distribution.entry(s.chain_name.clone()).or_default() += 1;
            }
            LocationSummary {
                zip_code: zip_code.to_string(),
                store_count: stores.len(),
                chain_distribution,
                avg_latitude: stats::mean(stores.iter().filter_map(|s| s.latitude)),
                avg_longitude: stats::mean(stores.iter().filter_map(|s| s.longitude)),
            }
        })
        .collect()
}
