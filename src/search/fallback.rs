// Fallback Search - plain case-insensitive substring matching.
// Cannot reject or fail; the engine degrades to it whenever a pattern does.

use super::{field_values, SearchField};
use crate::transaction::Transaction;

/// Transactions whose description, category, amount or date contains `term`,
/// ignoring case. Input order is kept.
pub fn fallback_search(transactions: &[Transaction], term: &str) -> Vec<Transaction> {
    fallback_search_by(transactions, term, SearchField::All)
}

pub fn fallback_search_by(
    transactions: &[Transaction],
    term: &str,
    field: SearchField,
) -> Vec<Transaction> {
    let needle = term.to_lowercase();

    transactions
        .iter()
        .filter(|tx| {
            field_values(tx, field)
                .iter()
                .any(|value| value.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Category;

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new("Coffee run", 4.5, Category::Food, "2024-01-01").unwrap(),
            Transaction::new("Bus fare", 2.0, Category::Transport, "2024-01-02").unwrap(),
        ]
    }

    #[test]
    fn test_case_insensitive_substring() {
        let txs = sample();

        assert_eq!(fallback_search(&txs, "COFFEE"), vec![txs[0].clone()]);
        assert_eq!(fallback_search(&txs, "transp"), vec![txs[1].clone()]);
        assert_eq!(fallback_search(&txs, "4.5"), vec![txs[0].clone()]);
        assert_eq!(fallback_search(&txs, "01-02"), vec![txs[1].clone()]);
    }

    #[test]
    fn test_regex_syntax_is_literal() {
        let mut txs = sample();
        txs.push(
            Transaction::new("Lunch (((((work)))))", 9.0, Category::Food, "2024-01-03").unwrap(),
        );

        assert_eq!(fallback_search(&txs, "(((((w"), vec![txs[2].clone()]);
        assert!(fallback_search(&txs, "coffee|tea").is_empty());
    }

    #[test]
    fn test_empty_term_keeps_everything() {
        let txs = sample();
        assert_eq!(fallback_search(&txs, ""), txs);
    }

    #[test]
    fn test_single_field() {
        let txs = sample();

        assert!(fallback_search_by(&txs, "food", SearchField::Description).is_empty());
        assert_eq!(
            fallback_search_by(&txs, "food", SearchField::Category),
            vec![txs[0].clone()]
        );
    }
}
