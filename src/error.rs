// Search error taxonomy.
// Every `Rejection` is recoverable: callers degrade to substring search.

use std::fmt;
use thiserror::Error;

/// Which structural red flag the danger classifier found in a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerSignal {
    NestedGroups,
    ExcessiveRepetition,
    WildcardRun,
    QuantifiedAlternation,
    BoundaryRun,
    RecursivePattern,
    BackreferenceChain,
}

impl DangerSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            DangerSignal::NestedGroups => "nested_groups",
            DangerSignal::ExcessiveRepetition => "excessive_repetition",
            DangerSignal::WildcardRun => "wildcard_run",
            DangerSignal::QuantifiedAlternation => "quantified_alternation",
            DangerSignal::BoundaryRun => "boundary_run",
            DangerSignal::RecursivePattern => "recursive_pattern",
            DangerSignal::BackreferenceChain => "backreference_chain",
        }
    }
}

impl fmt::Display for DangerSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a search pattern was not approved
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Pattern is empty")]
    EmptyPattern,

    #[error("Pattern is too long ({length} > {max} characters)")]
    TooLong { length: usize, max: usize },

    #[error("Pattern looks dangerous: {0}")]
    DangerousPattern(DangerSignal),

    #[error("Pattern does not compile: {0}")]
    SyntaxError(String),

    #[error("Pattern is too slow ({elapsed_ms}ms > {budget_ms}ms budget)")]
    TooSlow { elapsed_ms: u128, budget_ms: u128 },

    #[error("Pattern failed while matching: {0}")]
    RuntimeError(String),
}

impl Rejection {
    /// Stable tag for log fields
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::EmptyPattern => "empty_pattern",
            Rejection::TooLong { .. } => "too_long",
            Rejection::DangerousPattern(_) => "dangerous_pattern",
            Rejection::SyntaxError(_) => "syntax_error",
            Rejection::TooSlow { .. } => "too_slow",
            Rejection::RuntimeError(_) => "runtime_error",
        }
    }
}

/// Errors building a search engine
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search configuration: {0}")]
    Config(String),

    #[error("Failed to build danger classifier: {0}")]
    Classifier(#[from] regex::Error),
}
