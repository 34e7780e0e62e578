use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerwiseError, Result};

pub const DEFAULT_CATEGORY: &str = "OTHER";

// Checked in order against the upper-cased description; first hit wins.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("UBER EATS", "FOOD"),
    ("UBER", "TRANSPORT"),
    ("99APP", "TRANSPORT"),
    ("99 POP", "TRANSPORT"),
    ("CABIFY", "TRANSPORT"),
    ("POSTO", "TRANSPORT"),
    ("ESTACIONAMENTO", "TRANSPORT"),
    ("IFOOD", "FOOD"),
    ("RAPPI", "FOOD"),
    ("SUPERMERCADO", "FOOD"),
    ("MERCADO", "FOOD"),
    ("PADARIA", "FOOD"),
    ("RESTAURANTE", "FOOD"),
    ("NETFLIX", "ENTERTAINMENT"),
    ("SPOTIFY", "ENTERTAINMENT"),
    ("DISNEY", "ENTERTAINMENT"),
    ("CINEMA", "ENTERTAINMENT"),
    ("FARMACIA", "HEALTH"),
    ("DROGARIA", "HEALTH"),
    ("HOSPITAL", "HEALTH"),
    ("ALUGUEL", "HOUSING"),
    ("CONDOMINIO", "HOUSING"),
    ("ENERGIA", "BILLS"),
    ("INTERNET", "BILLS"),
    ("TELEFONE", "BILLS"),
    ("ESCOLA", "EDUCATION"),
    ("FACULDADE", "EDUCATION"),
    ("AMAZON", "SHOPPING"),
    ("SALARIO", "SALARY"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    Regex,
}

/// A user-defined rule as stored in settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub category: String,
    #[serde(default)]
    pub match_type: MatchType,
}

#[derive(Debug, Clone)]
enum Matcher {
    Contains(String),
    StartsWith(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct CategoryRule {
    matcher: Matcher,
    category: String,
}

impl CategoryRule {
    pub fn new(pattern: &str, category: &str, match_type: MatchType) -> Result<Self> {
        let matcher = match match_type {
            MatchType::Contains => Matcher::Contains(pattern.to_uppercase()),
            MatchType::StartsWith => Matcher::StartsWith(pattern.to_uppercase()),
            MatchType::Regex => Matcher::Regex(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        LedgerwiseError::InvalidInput(format!("bad rule pattern '{pattern}': {e}"))
                    })?,
            ),
        };
        Ok(Self {
            matcher,
            category: category.trim().to_uppercase(),
        })
    }

    /// `desc_upper` must already be upper-cased.
    fn matches(&self, desc_upper: &str) -> bool {
        match &self.matcher {
            Matcher::Contains(pat) => desc_upper.contains(pat.as_str()),
            Matcher::StartsWith(pat) => desc_upper.starts_with(pat.as_str()),
            Matcher::Regex(re) => re.is_match(desc_upper),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }
}

fn builtin_rules() -> Vec<CategoryRule> {
    BUILTIN_RULES
        .iter()
        .map(|(pattern, category)| CategoryRule {
            matcher: Matcher::Contains((*pattern).to_string()),
            category: (*category).to_string(),
        })
        .collect()
}

impl Categorizer {
    /// User rules run ahead of the built-in table.
    pub fn with_rules(user_rules: &[RuleConfig]) -> Result<Self> {
        let mut rules = user_rules
            .iter()
            .map(|r| CategoryRule::new(&r.pattern, &r.category, r.match_type))
            .collect::<Result<Vec<_>>>()?;
        rules.extend(builtin_rules());
        Ok(Self { rules })
    }

    pub fn categorize(&self, description: &str) -> &str {
        let desc_upper = description.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&desc_upper))
            .map(|rule| rule.category.as_str())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
