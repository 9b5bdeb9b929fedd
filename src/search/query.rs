// 🧩 Query Parser - splits `field:value` tags out of a search box string
//
//   category:Food amount:>20 date:2024-01-01 description:"corner cafe" extra
//
// Tags are consumed in a fixed order (category, amount, date, description);
// whatever text remains, trimmed, becomes the free-text term unless a
// description tag already set it.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static CATEGORY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcategory:(\w+)").expect("valid regex"));

#[allow(clippy::expect_used)]
static AMOUNT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bamount:(>=|<=|>|<)?(\d+(?:\.\d+)?)").expect("valid regex")
});

#[allow(clippy::expect_used)]
static DATE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdate:(\d{4}-\d{2}-\d{2})").expect("valid regex"));

#[allow(clippy::expect_used)]
static DESCRIPTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bdescription:"([^"]*)""#).expect("valid regex"));

// ============================================================================
// SEARCH FIELD
// ============================================================================

/// Which transaction attribute a text search looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    All,
    Description,
    Category,
    Amount,
    Date,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::All => "all",
            SearchField::Description => "description",
            SearchField::Category => "category",
            SearchField::Amount => "amount",
            SearchField::Date => "date",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SearchField::All),
            "description" => Ok(SearchField::Description),
            "category" => Ok(SearchField::Category),
            "amount" => Ok(SearchField::Amount),
            "date" => Ok(SearchField::Date),
            other => anyhow::bail!("Unknown search field: {:?}", other),
        }
    }
}

// ============================================================================
// SEARCH OPTIONS
// ============================================================================

/// Filters for `advanced_search`. Every filter that is set
/// narrows the result; unset filters keep everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    pub term: String,
    pub field: SearchField,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Category names, no duplicates, in the order first given
    pub categories: Vec<String>,
}

impl SearchOptions {
    pub fn add_category(&mut self, category: &str) {
        if !self
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
        {
            self.categories.push(category.to_string());
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

pub fn parse_search_query(query: &str) -> SearchOptions {
    let mut options = SearchOptions::default();
    let mut term_set = false;

    for caps in CATEGORY_TAG.captures_iter(query) {
        options.add_category(&caps[1]);
    }
    let rest = CATEGORY_TAG.replace_all(query, "");

    for caps in AMOUNT_TAG.captures_iter(&rest) {
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        match caps.get(1).map(|op| op.as_str()) {
            Some(">") | Some(">=") => options.min_amount = Some(value),
            Some("<") | Some("<=") => options.max_amount = Some(value),
            // No operator sets neither bound. Looks unintended (exact match
            // or both bounds?) but kept until the intent is settled.
            _ => debug!(value, "amount tag without comparison operator ignored"),
        }
    }
    let rest = AMOUNT_TAG.replace_all(&rest, "");

    for caps in DATE_TAG.captures_iter(&rest) {
        match NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
            Ok(date) => {
                options.start_date = Some(date);
                options.end_date = Some(date);
            }
            Err(_) => debug!(date = &caps[1], "date tag is not a calendar date, ignored"),
        }
    }
    let rest = DATE_TAG.replace_all(&rest, "");

    for caps in DESCRIPTION_TAG.captures_iter(&rest) {
        options.term = caps[1].to_string();
        options.field = SearchField::Description;
        term_set = true;
    }
    let rest = DESCRIPTION_TAG.replace_all(&rest, "");

    let free_text = rest.trim();
    if !term_set && !free_text.is_empty() {
        options.term = free_text.to_string();
    }

    options
}

// ============================================================================
// TESTS
// ============================================================================
