//! Description classification with ordered, short-circuiting regex rules

use regex::Regex;
use std::sync::Arc;

use crate::config::CategoryPatterns;
use crate::error::{Result, StatsError};
use crate::models::{Category, CategorySet};

/// A category paired with the pattern that selects it
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: Category,
    pub pattern: Regex,
}

impl Rule {
    pub fn new(category: Category, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            StatsError::ConfigError(format!(
                "Invalid pattern for category '{}': {}",
                category, e
            ))
        })?;
        Ok(Self { category, pattern })
    }
}

/// Ordered rule list, immutable once built
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, rejecting categories declared twice
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.category == rule.category) {
                return Err(StatsError::ConfigError(format!(
                    "Category '{}' has more than one pattern",
                    rule.category
                )));
            }
        }
        Ok(Self { rules })
    }

    /// Compile the configured pattern table, keeping its order
    pub fn from_patterns(patterns: &CategoryPatterns) -> Result<Self> {
        if patterns.is_empty() {
            return Err(StatsError::ConfigError(
                "youtube.category_patterns cannot be empty".to_string(),
            ));
        }

        let rules = patterns
            .iter()
            .map(|(name, pattern)| {
                let category = name.parse::<Category>().map_err(|_| {
                    StatsError::ConfigError(format!(
                        "Unknown category '{}' in youtube.category_patterns",
                        name
                    ))
                })?;
                Rule::new(category, pattern)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(rules)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Classifies description text against a shared rule set
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleSet>,
}

impl Classifier {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Collect the categories whose pattern matches anywhere in `text`.
    ///
    /// Rules run in declaration order. Reaching the bulk rule after something
    /// has already matched ends classification; no later rule is consulted.
    pub fn classify(&self, text: &str) -> CategorySet {
        let mut categories = CategorySet::new();

        for rule in self.rules.iter() {
            if rule.category.is_bulk() && !categories.is_empty() {
                break;
            }
            if rule.pattern.is_match(text) {
                categories.insert(rule.category);
            }
        }

        categories
    }
}
