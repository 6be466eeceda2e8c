//! ZIP-level keyword frequencies.

use std::collections::BTreeMap;

use crate::store_category::StoreCategoryStat;
use crate::zip_rollup::{ZipCategoryKey, ZipRollup};

/// Token → occurrence count, ordered by token.
pub type KeywordFrequency = BTreeMap<String, u64>;

/// Count keywords of every statistic sharing a rollup's ZIP and category.
///
/// Every rollup key gets an entry; keys without contributions map to an
/// empty frequency table.
pub fn zip_keyword_frequency(
    rollups: &[ZipRollup],
    stats: &[StoreCategoryStat],
) -> BTreeMap<ZipCategoryKey, KeywordFrequency> {
    let mut freq: BTreeMap<ZipCategoryKey, KeywordFrequency> =
        rollups.iter().map(|r| (r.key(), KeywordFrequency::new())).collect();

    for s in stats {
        let Some(zip) = s.zip_code.as_ref() else {
            continue;
        };
        let Some(counts) = freq.get_mut(&(zip.clone(), s.category.clone())) else {
            continue;
        };
        for word in &s.keywords {
            *counts.entry(word.clone()).or_default() += 1;
        }
    }
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(loc: &str, uom: &str, zip: &str, keywords: &[&str]) -> StoreCategoryStat {
        StoreCategoryStat {
            location_id: loc.into(),
            category: "Egg".into(),
            uom: uom.into(),
            product_count: 1,
            stock_observations: 1,
            avg_price: Some(0.3),
            min_price: Some(0.3),
            max_price: Some(0.3),
            median_price: Some(0.3),
            price_volatility: 0.0,
            promo_frequency: 0.0,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            zip_code: Some(zip.into()),
        }
    }

    fn rollup(zip: &str, category: &str) -> ZipRollup {
        ZipRollup {
            zip_code: zip.into(),
            category: category.into(),
            avg_price: Some(0.3),
            min_price: Some(0.3),
            max_price: Some(0.3),
            median_price: Some(0.3),
            price_volatility: 0.0,
            promo_frequency: 0.0,
            avg_product_count: 1.0,
        }
    }

    #[test]
    fn counts_across_stores() {
        let stats = vec![
            stat("01", "ct", "45202", &["large", "brown", "large"]),
            stat("02", "ct", "45202", &["large", "organic"]),
            stat("03", "ct", "45203", &["jumbo"]),
        ];
        let freq = zip_keyword_frequency(&[rollup("45202", "Egg")], &stats);
        let counts = &freq[&("45202".to_string(), "Egg".to_string())];
        assert_eq!(counts["large"], 3);
        assert_eq!(counts["brown"], 1);
        assert_eq!(counts["organic"], 1);
        assert!(!counts.contains_key("jumbo"));
    }

    #[test]
    fn every_unit_row_contributes() {
        // Two unit rows of one store carry the same store-category list.
        let stats = vec![
            stat("01", "ct", "45202", &["large"]),
            stat("01", "oz", "45202", &["large"]),
        ];
        let freq = zip_keyword_frequency(&[rollup("45202", "Egg")], &stats);
        assert_eq!(freq[&("45202".to_string(), "Egg".to_string())]["large"], 2);
    }

    #[test]
    fn key_without_contributions_is_empty_map() {
        let freq = zip_keyword_frequency(&[rollup("45209", "Bread")], &[]);
        assert!(freq[&("45209".to_string(), "Bread".to_string())].is_empty());
    }
}
