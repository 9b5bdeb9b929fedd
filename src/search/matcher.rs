// 🔎 Matcher - applies an approved pattern to transactions and text

use super::pattern::ApprovedPattern;
use super::{field_values, SearchField};
use crate::error::Rejection;
use crate::transaction::Transaction;

/// Transactions where the pattern matches description, category, amount or
/// date. Input order is kept. A runtime fault aborts the whole pass.
pub fn filter_transactions(
    transactions: &[Transaction],
    pattern: &ApprovedPattern,
) -> Result<Vec<Transaction>, Rejection> {
    filter_by_field(transactions, pattern, SearchField::All)
}

/// Same as `filter_transactions`, restricted to one field
pub fn filter_by_field(
    transactions: &[Transaction],
    pattern: &ApprovedPattern,
    field: SearchField,
) -> Result<Vec<Transaction>, Rejection> {
    let mut matched = Vec::new();

    for tx in transactions {
        if matches_any_field(tx, pattern, field)? {
            matched.push(tx.clone());
        }
    }

    Ok(matched)
}

fn matches_any_field(
    tx: &Transaction,
    pattern: &ApprovedPattern,
    field: SearchField,
) -> Result<bool, Rejection> {
    for value in field_values(tx, field) {
        if pattern.is_match(&value)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ============================================================================
// HIGHLIGHTING
// ============================================================================

/// Neutralize every character with markup significance
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wrap every non-overlapping match in `<mark class="...">`.
///
/// Matching runs on the raw text and every segment, matched or not, is
/// escaped on the way out, so a match can never split an entity and no
/// user character reaches the output unescaped. Empty matches are skipped.
pub fn highlight(
    text: &str,
    pattern: &ApprovedPattern,
    highlight_class: &str,
) -> Result<String, Rejection> {
    pattern.check_input(text)?;

    let open_tag = format!("<mark class=\"{}\">", escape_html(highlight_class));
    let mut out = String::with_capacity(text.len() + 32);
    let mut last = 0;

    for m in pattern.regex().find_iter(text) {
        if m.is_empty() {
            continue;
        }
        out.push_str(&escape_html(&text[last..m.start()]));
        out.push_str(&open_tag);
        out.push_str(&escape_html(m.as_str()));
        out.push_str("</mark>");
        last = m.end();
    }
    out.push_str(&escape_html(&text[last..]));

    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::search::guard::PatternGuard;
    use crate::search::prober::SystemClock;
    use crate::transaction::Category;
    use std::sync::Arc;

    fn approve(pattern: &str) -> ApprovedPattern {
        PatternGuard::new(&SearchConfig::default(), Arc::new(SystemClock))
            .unwrap()
            .compile(pattern, "i")
            .unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new("Coffee run", 4.5, Category::Food, "2024-01-01").unwrap(),
            Transaction::new("Bus fare", 2.0, Category::Transport, "2024-01-02").unwrap(),
            Transaction::new("Cinema", 12.0, Category::Entertainment, "2024-02-10").unwrap(),
        ]
    }

    #[test]
    fn test_filter_matches_any_field() {
        let txs = sample();

        let by_description = filter_transactions(&txs, &approve("coffee|tea")).unwrap();
        assert_eq!(by_description, vec![txs[0].clone()]);

        let by_category = filter_transactions(&txs, &approve("^transport$")).unwrap();
        assert_eq!(by_category, vec![txs[1].clone()]);

        let by_amount = filter_transactions(&txs, &approve(r"^4\.5$")).unwrap();
        assert_eq!(by_amount, vec![txs[0].clone()]);

        let by_date = filter_transactions(&txs, &approve("2024-01")).unwrap();
        assert_eq!(by_date, vec![txs[0].clone(), txs[1].clone()]);
    }

    #[test]
    fn test_filter_by_single_field() {
        let txs = sample();

        // "Food" is a category, not a description
        let result = filter_by_field(&txs, &approve("food"), SearchField::Description).unwrap();
        assert!(result.is_empty());

        let result = filter_by_field(&txs, &approve("food"), SearchField::Category).unwrap();
        assert_eq!(result, vec![txs[0].clone()]);
    }

    #[test]
    fn test_filter_preserves_order() {
        let txs = sample();
        let result = filter_transactions(&txs, &approve("e")).unwrap();

        let ids: Vec<_> = result.iter().map(|t| t.id.as_str()).collect();
        let expected: Vec<_> = txs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_filter_runtime_fault_aborts() {
        let pattern = approve("x");
        let mut txs = sample();
        let mut oversized =
            Transaction::new("placeholder", 1.0, Category::Other, "2024-03-01").unwrap();
        oversized.description = "long ".repeat(2_001);
        txs.push(oversized);

        assert!(matches!(
            filter_transactions(&txs, &pattern),
            Err(Rejection::RuntimeError(_))
        ));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_highlight_wraps_every_match() {
        let html = highlight("Coffee and more coffee", &approve("coffee"), "hl").unwrap();
        assert_eq!(
            html,
            "<mark class=\"hl\">Coffee</mark> and more <mark class=\"hl\">coffee</mark>"
        );
    }

    #[test]
    fn test_highlight_escapes_user_markup() {
        let html = highlight("<b>Tea</b> & cake", &approve("tea|<b>"), "hl").unwrap();
        assert_eq!(
            html,
            "<mark class=\"hl\">&lt;b&gt;</mark><mark class=\"hl\">Tea</mark>&lt;/b&gt; &amp; cake"
        );
    }

    #[test]
    fn test_highlight_skips_empty_matches() {
        let html = highlight("abc", &approve("x*"), "hl").unwrap();
        assert_eq!(html, "abc");
    }
}
