//! Keyword mining over product descriptions.
//!
//! Tokens are whitespace-split, reduced to ASCII letters and lower-cased.
//! Category names are excluded. Multiplicity is preserved so the lists can
//! be counted later.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::product_summary::ProductSummary;

/// Placeholder list for a group whose descriptions yield no keyword.
pub const FALLBACK_KEYWORD: &str = "other";

/// Words dropped because they only restate the product category.
pub const DEFAULT_EXCLUDED: [&str; 3] = ["egg", "eggs", "bread"];

/// (Location ID, Product Category)
pub type StoreCategoryKey = (String, String);

#[derive(Debug, Clone)]
pub struct KeywordMiner {
    excluded: FxHashSet<String>,
}

impl KeywordMiner {
    pub fn new<S: AsRef<str>>(excluded: impl IntoIterator<Item = S>) -> Self {
        Self {
            excluded: excluded
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Cleaned form of one token, or `None` if it carries no keyword.
    pub fn clean_token(&self, word: &str) -> Option<String> {
        let cleaned: String = word
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if cleaned.is_empty() || self.excluded.contains(&cleaned) {
            return None;
        }
        Some(cleaned)
    }

    /// Keyword sequence of a set of descriptions, `["other"]` when empty.
    pub fn keyword_list<'a>(&self, descriptions: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut keywords: Vec<String> = descriptions
            .into_iter()
            .flat_map(|d| d.split_whitespace())
            .filter_map(|w| self.clean_token(w))
            .collect();
        if keywords.is_empty() {
            keywords.push(FALLBACK_KEYWORD.to_string());
        }
        keywords
    }

    /// Keyword lists per (Location ID, Product Category).
    ///
    /// Descriptions are taken in the order of `products`, one per distinct
    /// product, so a product seen on many dates counts once.
    pub fn mine(&self, products: &[ProductSummary]) -> BTreeMap<StoreCategoryKey, Vec<String>> {
        let mut grouped: BTreeMap<StoreCategoryKey, Vec<&str>> = BTreeMap::new();
        for p in products {
            grouped
                .entry((p.location_id.clone(), p.category.clone()))
                .or_default()
                .push(p.description.as_str());
        }
        grouped
            .into_iter()
            .map(|(key, descriptions)| (key, self.keyword_list(descriptions)))
            .collect()
    }
}

impl Default for KeywordMiner {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED)
    }
}
