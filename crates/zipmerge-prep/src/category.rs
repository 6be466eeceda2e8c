//! Rule-based product classification.
//!
//! Rules are evaluated in order; the first whose pattern occurs in the
//! lower-cased description wins.

/// Substring pattern mapped to a category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub pattern: String,
    pub category: String,
}

impl CategoryRule {
    pub fn new(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl Classifier {
    pub fn new(rules: Vec<CategoryRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    pub fn classify(&self, description: &str) -> &str {
        let desc = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| desc.contains(rule.pattern.as_str()))
            .map_or(self.fallback.as_str(), |rule| rule.category.as_str())
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            vec![
                CategoryRule::new("egg", "Egg"),
                CategoryRule::new("bread", "Bread"),
            ],
            "Other",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules() {
        let c = Classifier::default();
        assert_eq!(c.classify("Kroger Grade A Large Eggs"), "Egg");
        assert_eq!(c.classify("Nature's Own Honey Wheat BREAD"), "Bread");
        assert_eq!(c.classify("Whole Milk"), "Other");
    }

    #[test]
    fn first_rule_wins() {
        // "egg" is listed before "bread"
        assert_eq!(Classifier::default().classify("Egg Bread Loaf"), "Egg");
    }

    #[test]
    fn custom_rules_extend_categories() {
        let c = Classifier::new(
            vec![
                CategoryRule::new("MILK", "Milk"),
                CategoryRule::new("egg", "Egg"),
            ],
            "Misc",
        );
        assert_eq!(c.classify("2% reduced fat milk"), "Milk");
        assert_eq!(c.classify("cage free eggs"), "Egg");
        assert_eq!(c.classify("apples"), "Misc");
        assert_eq!(c.rules().len(), 2);
    }
}
