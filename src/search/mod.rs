// Search Engine
//
// raw term → Pattern Guard (static checks, compile, timing probe)
//          → Matcher            when approved
//          → Fallback Search    when rejected, or when matching faults
//
// Everything runs synchronously on the caller's thread and only reads the
// transactions it is given. A search never fails outwardly.

pub mod fallback;
pub mod guard;
pub mod matcher;
pub mod pattern;
pub mod prober;
pub mod query;

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::config::SearchConfig;
use crate::error::{Rejection, SearchError};
use crate::transaction::Transaction;

pub use fallback::{fallback_search, fallback_search_by};
pub use guard::{DangerClassifier, PatternGuard, DEFAULT_FLAGS};
pub use matcher::{escape_html, filter_by_field, filter_transactions, highlight};
pub use pattern::{ApprovedPattern, CandidatePattern};
pub use prober::{Clock, PerformanceProber, SteppingClock, SystemClock};
pub use query::{parse_search_query, SearchField, SearchOptions};

/// Searchable text of a transaction for the given field.
/// For `All` the order is description, category, amount, date.
pub(crate) fn field_values(tx: &Transaction, field: SearchField) -> Vec<Cow<'_, str>> {
    match field {
        SearchField::All => vec![
            Cow::Borrowed(tx.description.as_str()),
            Cow::Borrowed(tx.category.as_str()),
            Cow::Owned(tx.amount_text()),
            Cow::Borrowed(tx.date.as_str()),
        ],
        SearchField::Description => vec![Cow::Borrowed(tx.description.as_str())],
        SearchField::Category => vec![Cow::Borrowed(tx.category.as_str())],
        SearchField::Amount => vec![Cow::Owned(tx.amount_text())],
        SearchField::Date => vec![Cow::Borrowed(tx.date.as_str())],
    }
}

// ============================================================================
// SEARCH ENGINE
// ============================================================================

pub struct SearchEngine {
    config: SearchConfig,
    guard: PatternGuard,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build an engine whose timing probe reads the given clock
    pub fn with_clock(config: SearchConfig, clock: Arc<dyn Clock>) -> Result<Self, SearchError> {
        config.validate()?;
        let guard = PatternGuard::new(&config, clock)?;
        Ok(SearchEngine { config, guard })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run a pattern through every safety check
    pub fn compile(&self, pattern: &str, flags: &str) -> Result<ApprovedPattern, Rejection> {
        self.guard.compile(pattern, flags)
    }

    /// Case-insensitive pattern search over all fields, with substring
    /// search standing in for any pattern that is refused or faults.
    pub fn search_transactions(
        &self,
        transactions: &[Transaction],
        term: &str,
    ) -> Vec<Transaction> {
        self.search_field(transactions, term, SearchField::All)
    }

    fn search_field(
        &self,
        transactions: &[Transaction],
        term: &str,
        field: SearchField,
    ) -> Vec<Transaction> {
        let pattern = match self.guard.compile(term, DEFAULT_FLAGS) {
            Ok(pattern) => pattern,
            Err(_) => return fallback_search_by(transactions, term, field),
        };

        match filter_by_field(transactions, &pattern, field) {
            Ok(found) => found,
            Err(rejection) => {
                warn!(
                    reason = rejection.reason(),
                    pattern = %pattern,
                    "Pattern faulted while filtering, using substring search: {}",
                    rejection
                );
                fallback_search_by(transactions, term, field)
            }
        }
    }

    /// Text search followed by amount, date and category narrowing, each
    /// applied to the previous result. All filters must hold.
    pub fn advanced_search(
        &self,
        transactions: &[Transaction],
        options: &SearchOptions,
    ) -> Vec<Transaction> {
        let mut results = if options.term.trim().is_empty() {
            transactions.to_vec()
        } else {
            self.search_field(transactions, &options.term, options.field)
        };

        if let Some(min) = options.min_amount {
            results.retain(|tx| tx.amount >= min);
        }
        if let Some(max) = options.max_amount {
            results.retain(|tx| tx.amount <= max);
        }
        // A date that does not parse never satisfies a date bound
        if let Some(start) = options.start_date {
            results.retain(|tx| tx.calendar_date().is_some_and(|d| d >= start));
        }
        if let Some(end) = options.end_date {
            results.retain(|tx| tx.calendar_date().is_some_and(|d| d <= end));
        }
        if !options.categories.is_empty() {
            results.retain(|tx| {
                options
                    .categories
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(tx.category.as_str()))
            });
        }

        results
    }

    /// Markup-safe copy of `text` with matches of `term` wrapped in `<mark>`.
    /// Refused or faulting patterns yield the escaped text without marks.
    /// Matches are found in the raw text, then each segment is escaped: a match
    /// inside an entity like `&amp;` would otherwise emit a bare `&`.
    pub fn highlight_matches(&self, text: &str, term: &str) -> String {
        let Ok(pattern) = self.guard.compile(term, DEFAULT_FLAGS) else {
            return escape_html(text);
        };

        highlight(text, &pattern, &self.config.highlight_class).unwrap_or_else(|rejection| {
            warn!(
                reason = rejection.reason(),
                "Highlighting skipped: {}", rejection
            );
            escape_html(text)
        })
    }

    /// Up to `max_suggestions` distinct values, first seen first, drawn from
    /// descriptions and categories containing the term (ignoring case) and
    /// amounts containing it verbatim.
    pub fn search_suggestions(&self, transactions: &[Transaction], partial: &str) -> Vec<String> {
        let needle = partial.trim();
        let limit = self.config.max_suggestions;
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }
        let needle_lower = needle.to_lowercase();

        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();

        for tx in transactions {
            let amount = tx.amount_text();
            let candidates = [
                (tx.description.as_str(), true),
                (tx.category.as_str(), true),
                (amount.as_str(), false),
            ];

            for (value, ignore_case) in candidates {
                let hit = if ignore_case {
                    value.to_lowercase().contains(&needle_lower)
                } else {
                    value.contains(needle)
                };

                if hit && seen.insert(value.to_string()) {
                    suggestions.push(value.to_string());
                    if suggestions.len() >= limit {
                        return suggestions;
                    }
                }
            }
        }

        suggestions
    }

    pub fn parse_search_query(&self, query: &str) -> SearchOptions {
        parse_search_query(query)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Category, MAX_DESCRIPTION_LENGTH};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn engine() -> SearchEngine {
        SearchEngine::new(SearchConfig::default()).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new("Coffee run", 4.5, Category::Food, "2024-01-01").unwrap(),
            Transaction::new("Bus fare", 2.0, Category::Transport, "2024-01-02").unwrap(),
            Transaction::new("Groceries", 54.2, Category::Food, "2024-01-15").unwrap(),
            Transaction::new("Electric bill", 80.0, Category::Bills, "2024-02-01").unwrap(),
            Transaction::new("Concert <live>", 35.0, Category::Entertainment, "2024-02-14")
                .unwrap(),
        ]
    }

    #[test]
    fn test_regex_alternation() {
        let txs = sample()[..2].to_vec();
        let result = engine().search_transactions(&txs, "coffee|tea");

        assert_eq!(result, vec![txs[0].clone()]);
    }

    #[test]
    fn test_rejected_pattern_uses_fallback() {
        let mut txs = sample();
        txs.push(Transaction::new("Odd (((((a)))))", 1.0, Category::Other, "2024-03-01").unwrap());
        let engine = engine();

        let term = "(((((a)))))";
        assert!(engine.compile(term, DEFAULT_FLAGS).is_err());
        assert_eq!(engine.search_transactions(&txs, term), fallback_search(&txs, term));
        assert_eq!(engine.search_transactions(&txs, term).len(), 1);
    }

    #[test]
    fn test_syntax_error_uses_fallback() {
        let mut txs = sample();
        txs.push(Transaction::new("Refund [pending", 3.0, Category::Other, "2024-03-02").unwrap());

        let result = engine().search_transactions(&txs, "[pending");
        assert_eq!(result, vec![txs[5].clone()]);
    }

    #[test]
    fn test_slow_pattern_uses_fallback() {
        // Every clock read advances a full second, so any probe is too slow
        let clock = Arc::new(SteppingClock::new(Duration::from_secs(1)));
        let engine = SearchEngine::with_clock(SearchConfig::default(), clock).unwrap();
        let txs = sample();

        assert!(matches!(
            engine.compile("bus", DEFAULT_FLAGS),
            Err(Rejection::TooSlow { .. })
        ));
        // Substring search still finds it; "b.s" only matches as a regex
        assert_eq!(engine.search_transactions(&txs, "bus"), vec![txs[1].clone()]);
        assert!(engine.search_transactions(&txs, "b.s").is_empty());
    }

    #[test]
    fn test_longest_description_keeps_regex_search() {
        let mut txs = sample()[..2].to_vec();
        txs.push(
            Transaction::new(
                &"z".repeat(MAX_DESCRIPTION_LENGTH),
                1.0,
                Category::Other,
                "2024-03-01",
            )
            .unwrap(),
        );
        let engine = engine();

        assert_eq!(engine.search_transactions(&txs, "coffee|tea"), vec![txs[0].clone()]);
    }

    #[test]
    fn test_anchored_search_is_idempotent_with_long_rows() {
        let mut txs = vec![
            Transaction::new("y^x", 1.0, Category::Other, "2024-03-01").unwrap(),
            Transaction::new("xylophone", 9.0, Category::Shopping, "2024-03-02").unwrap(),
        ];
        txs.push(
            Transaction::new(
                &"z".repeat(MAX_DESCRIPTION_LENGTH),
                1.0,
                Category::Other,
                "2024-03-03",
            )
            .unwrap(),
        );
        let engine = engine();

        let once = engine.search_transactions(&txs, "^x");
        let twice = engine.search_transactions(&once, "^x");

        assert_eq!(once, vec![txs[1].clone()]);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_runtime_fault_uses_fallback() {
        // Fields assigned directly skip validation, so the cap can still trip
        let engine = engine();
        let mut txs = sample();
        let mut oversized =
            Transaction::new("placeholder", 1.0, Category::Other, "2024-03-01").unwrap();
        oversized.description = "x".repeat(engine.config().max_input_length + 1);
        txs.push(oversized);

        // As a regex "r.n" matches "Coffee run", but the oversized row faults
        // the pass and the literal substring matches nothing
        let result = engine.search_transactions(&txs, "r.n");
        assert_eq!(result, fallback_search(&txs, "r.n"));
        assert!(result.is_empty());
    }

    #[test]
    fn test_highlight_over_cap_text_is_escaped() {
        let engine = engine();
        let text = format!("<b>{}", "z".repeat(engine.config().max_input_length));

        let html = engine.highlight_matches(&text, "z");

        assert_eq!(html, escape_html(&text));
        assert!(html.starts_with("&lt;b&gt;zzz"));
        assert!(!html.contains("<mark"));
    }

    #[test]
    fn test_empty_term_returns_everything() {
        let txs = sample();
        assert_eq!(engine().search_transactions(&txs, ""), txs);
    }

    #[test]
    fn test_advanced_amount_range() {
        let txs = sample();
        let options = SearchOptions {
            min_amount: Some(10.0),
            max_amount: Some(54.2),
            ..SearchOptions::default()
        };

        let result = engine().advanced_search(&txs, &options);
        assert_eq!(result, vec![txs[2].clone(), txs[4].clone()]);
    }

    #[test]
    fn test_advanced_date_and_category() {
        let txs = sample();
        let options = SearchOptions {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            categories: vec!["food".to_string(), "Bills".to_string()],
            ..SearchOptions::default()
        };

        let result = engine().advanced_search(&txs, &options);
        assert_eq!(result, vec![txs[2].clone(), txs[3].clone()]);
    }

    #[test]
    fn test_advanced_field_search() {
        let txs = sample();
        let options = SearchOptions {
            term: "food".to_string(),
            field: SearchField::Description,
            ..SearchOptions::default()
        };
        assert!(engine().advanced_search(&txs, &options).is_empty());

        let options = SearchOptions {
            term: "^food$".to_string(),
            field: SearchField::Category,
            ..SearchOptions::default()
        };
        assert_eq!(
            engine().advanced_search(&txs, &options),
            vec![txs[0].clone(), txs[2].clone()]
        );
    }

    #[test]
    fn test_advanced_with_parsed_query() {
        let txs = sample();
        let engine = engine();
        let options = engine.parse_search_query("category:Food amount:>20 gro");

        assert_eq!(engine.advanced_search(&txs, &options), vec![txs[2].clone()]);
    }

    #[test]
    fn test_highlight_matches() {
        let engine = engine();

        assert_eq!(
            engine.highlight_matches("Concert <live>", "live"),
            "Concert &lt;<mark class=\"search-highlight\">live</mark>&gt;"
        );
        // Refused pattern: escaped, unmarked
        assert_eq!(
            engine.highlight_matches("a < b", "(((((a)))))"),
            "a &lt; b"
        );
        assert_eq!(engine.highlight_matches("<i>", ""), "&lt;i&gt;");
    }

    #[test]
    fn test_suggestions() {
        let txs = sample();
        let engine = engine();

        assert_eq!(
            engine.search_suggestions(&txs, "fo"),
            vec!["Food".to_string()]
        );
        assert_eq!(
            engine.search_suggestions(&txs, "e"),
            vec![
                "Coffee run".to_string(),
                "Bus fare".to_string(),
                "Groceries".to_string(),
                "Electric bill".to_string(),
                "Concert <live>".to_string(),
                "Entertainment".to_string(),
            ]
        );
        assert_eq!(
            engine.search_suggestions(&txs, "4."),
            vec!["4.5".to_string(), "54.2".to_string()]
        );
        assert!(engine.search_suggestions(&txs, "  ").is_empty());
    }

    #[test]
    fn test_suggestions_capped() {
        let txs: Vec<Transaction> = (1..=30)
            .map(|i| {
                Transaction::new(&format!("Item {}", i), i as f64, Category::Shopping, "2024-01-01")
                    .unwrap()
            })
            .collect();

        let suggestions = engine().search_suggestions(&txs, "item");
        assert_eq!(suggestions.len(), 10);
        assert_eq!(suggestions[0], "Item 1");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SearchConfig {
            max_pattern_length: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(
            SearchEngine::new(config),
            Err(SearchError::Config(_))
        ));
    }
}
