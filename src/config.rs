// ⚙️ Search Configuration - explicit value handed to the engine
// Limits, probe corpus, danger thresholds and highlight markup

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::SearchError;
use crate::transaction::MAX_DESCRIPTION_LENGTH;

// ============================================================================
// DANGER THRESHOLDS
// ============================================================================

/// Thresholds for the static danger classifier.
/// The classifier over-approximates: a pattern hitting any threshold is refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerConfig {
    /// Group nesting depth that is refused (`((((a))))` has depth 4)
    pub max_group_depth: usize,

    /// Repetition count (literal run or `{n}` quantifier) that is refused
    pub repetition_threshold: usize,

    /// Consecutive `.*` wildcards that are refused
    pub wildcard_run: usize,

    /// Alternation branches carrying an unbounded quantifier; more is refused
    pub max_quantified_alternatives: usize,

    /// Consecutive `\b` anchors that are refused
    pub boundary_run: usize,

    /// Chained backreferences that are refused
    pub backreference_run: usize,
}

impl Default for DangerConfig {
    fn default() -> Self {
        DangerConfig {
            max_group_depth: 4,
            repetition_threshold: 20,
            wildcard_run: 3,
            max_quantified_alternatives: 4,
            boundary_run: 3,
            backreference_run: 3,
        }
    }
}

// ============================================================================
// SEARCH CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Longest accepted pattern, in characters after trimming
    pub max_pattern_length: usize,

    /// Wall-clock budget for the whole probe run
    pub probe_timeout_ms: u64,

    /// Sample inputs the prober times a pattern against
    pub probe_corpus: Vec<String>,

    /// Longest haystack a pattern may be run against.
    /// Must cover every stored field and every probe sample.
    pub max_input_length: usize,

    /// Compiled regex program size limit in bytes
    pub regex_size_limit: usize,

    /// CSS class of the `<mark>` element wrapped around matches
    pub highlight_class: String,

    pub max_suggestions: usize,

    pub danger: DangerConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_pattern_length: 100,
            probe_timeout_ms: 50,
            probe_corpus: default_probe_corpus(),
            max_input_length: 10_000,
            regex_size_limit: 1 << 20,
            highlight_class: "search-highlight".to_string(),
            max_suggestions: 10,
            danger: DangerConfig::default(),
        }
    }
}

fn default_probe_corpus() -> Vec<String> {
    vec![
        "test string".to_string(),
        "123.45".to_string(),
        "Food".to_string(),
        "2024-01-01".to_string(),
        "a".repeat(50),
        "test@example.com".to_string(),
    ]
}

impl SearchConfig {
    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read search config: {:?}", path.as_ref()))?;

        let config: SearchConfig =
            serde_json::from_str(&content).context("Failed to parse search config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), SearchError> {
        if self.max_pattern_length == 0 {
            return Err(SearchError::Config("max_pattern_length must be > 0".into()));
        }
        if self.probe_timeout_ms == 0 {
            return Err(SearchError::Config("probe_timeout_ms must be > 0".into()));
        }
        if self.max_input_length < MAX_DESCRIPTION_LENGTH {
            return Err(SearchError::Config(format!(
                "max_input_length must be at least {} to cover any description, got {}",
                MAX_DESCRIPTION_LENGTH, self.max_input_length
            )));
        }
        if let Some(sample) = self
            .probe_corpus
            .iter()
            .find(|s| s.chars().count() > self.max_input_length)
        {
            return Err(SearchError::Config(format!(
                "probe sample of {} characters exceeds max_input_length {}",
                sample.chars().count(),
                self.max_input_length
            )));
        }
        if self.highlight_class.is_empty()
            || !self
                .highlight_class
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SearchError::Config(format!(
                "highlight_class must be a plain CSS class name, got {:?}",
                self.highlight_class
            )));
        }

        let danger = &self.danger;
        if danger.max_group_depth == 0
            || danger.repetition_threshold == 0
            || danger.wildcard_run == 0
            || danger.boundary_run == 0
            || danger.backreference_run == 0
        {
            return Err(SearchError::Config("danger thresholds must be > 0".into()));
        }

        Ok(())
    }
}
