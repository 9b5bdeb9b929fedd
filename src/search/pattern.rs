// Compiled search patterns.
//
// A `CandidatePattern` has passed the static checks and compiled; an
// `ApprovedPattern` has additionally survived the timing probe. Only the
// prober can turn the former into the latter.

use regex::Regex;
use std::fmt;

use crate::error::Rejection;

#[derive(Debug, Clone)]
pub struct CandidatePattern {
    regex: Regex,
    max_input_length: usize,
}

impl CandidatePattern {
    pub(crate) fn new(regex: Regex, max_input_length: usize) -> Self {
        CandidatePattern {
            regex,
            max_input_length,
        }
    }

    /// Pattern source as compiled (trimmed, flags not included)
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Run the pattern against `text`.
    /// Haystacks longer than the configured input cap are a runtime fault.
    pub fn is_match(&self, text: &str) -> Result<bool, Rejection> {
        self.check_input(text)?;
        Ok(self.regex.is_match(text))
    }

    pub(crate) fn check_input(&self, text: &str) -> Result<(), Rejection> {
        // Byte length bounds char count from above
        if text.len() <= self.max_input_length {
            return Ok(());
        }
        let length = text.chars().count();
        if length > self.max_input_length {
            return Err(Rejection::RuntimeError(format!(
                "input of {} characters exceeds the {} character limit",
                length, self.max_input_length
            )));
        }
        Ok(())
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// A pattern that passed the danger classifier, compiled, and ran
/// within budget against the probe corpus.
#[derive(Debug, Clone)]
pub struct ApprovedPattern {
    inner: CandidatePattern,
}

impl ApprovedPattern {
    pub(super) fn approve(candidate: CandidatePattern) -> Self {
        ApprovedPattern { inner: candidate }
    }

    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn is_match(&self, text: &str) -> Result<bool, Rejection> {
        self.inner.is_match(text)
    }

    pub(crate) fn check_input(&self, text: &str) -> Result<(), Rejection> {
        self.inner.check_input(text)
    }

    pub(crate) fn regex(&self) -> &Regex {
        self.inner.regex()
    }
}

impl fmt::Display for ApprovedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
