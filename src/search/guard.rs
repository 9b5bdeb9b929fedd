// 🛡️ Pattern Guard - refuses unsafe search patterns before they run
//
// Order: empty → length → danger classifier → compile → timing probe.
// The danger classifier is a static over-approximation: it looks at the
// pattern text only and happily refuses some safe patterns.

use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::warn;

use super::pattern::{ApprovedPattern, CandidatePattern};
use super::prober::{Clock, PerformanceProber};
use crate::config::{DangerConfig, SearchConfig};
use crate::error::{DangerSignal, Rejection, SearchError};

/// Flags used when the caller gives none
pub const DEFAULT_FLAGS: &str = "i";

// ============================================================================
// PATTERN TOKENS
// ============================================================================

/// One character of pattern text, classified by where it sits
#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    /// Outside any character class, not escaped
    Plain(char),
    /// Preceded by a backslash
    Escaped(char),
    /// Inside `[...]`
    Class(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    let mut class_start = false;

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                tokens.push(if in_class {
                    Token::Class(next)
                } else {
                    Token::Escaped(next)
                });
            }
            class_start = false;
            continue;
        }

        if in_class {
            // `]` right after `[` or `[^` is a literal
            if c == ']' && !class_start {
                in_class = false;
                tokens.push(Token::Plain(c));
            } else {
                class_start = class_start && c == '^';
                tokens.push(Token::Class(c));
            }
            continue;
        }

        if c == '[' {
            in_class = true;
            class_start = true;
        }
        tokens.push(Token::Plain(c));
    }

    tokens
}

// ============================================================================
// DANGER CLASSIFIER
// ============================================================================

pub struct DangerClassifier {
    config: DangerConfig,
    counted_repetition: Regex,
    wildcard_run: Regex,
    boundary_run: Regex,
    recursion: Regex,
    backreference_run: Regex,
}

impl DangerClassifier {
    pub fn new(config: &DangerConfig) -> Result<Self, regex::Error> {
        Ok(DangerClassifier {
            config: config.clone(),
            counted_repetition: Regex::new(r"\{\s*(\d+)\s*(?:,\s*(\d*)\s*)?\}")?,
            wildcard_run: Regex::new(&format!(r"(?:\.[*+]\??){{{},}}", config.wildcard_run))?,
            boundary_run: Regex::new(&format!(r"(?:\\[bB]\s*){{{},}}", config.boundary_run))?,
            recursion: Regex::new(r"\(\?(?:R|[+-]?\d+|&\w+|P>\w+)\)|\\g<[^>]*>|\\g'[^']*'")?,
            backreference_run: Regex::new(&format!(
                r"(?:\\(?:[1-9][0-9]*|k<\w+>|k'\w+')\s*){{{},}}",
                config.backreference_run
            ))?,
        })
    }

    /// First red flag found in `pattern`, if any
    pub fn classify(&self, pattern: &str) -> Option<DangerSignal> {
        let tokens = tokenize(pattern);

        if group_depth(&tokens) >= self.config.max_group_depth {
            return Some(DangerSignal::NestedGroups);
        }
        if self.has_excessive_repetition(pattern, &tokens) {
            return Some(DangerSignal::ExcessiveRepetition);
        }
        if self.wildcard_run.is_match(pattern) {
            return Some(DangerSignal::WildcardRun);
        }
        if quantified_alternatives(&tokens) > self.config.max_quantified_alternatives {
            return Some(DangerSignal::QuantifiedAlternation);
        }
        if self.boundary_run.is_match(pattern) {
            return Some(DangerSignal::BoundaryRun);
        }
        if self.recursion.is_match(pattern) {
            return Some(DangerSignal::RecursivePattern);
        }
        if self.backreference_run.is_match(pattern) {
            return Some(DangerSignal::BackreferenceChain);
        }

        None
    }

    fn has_excessive_repetition(&self, pattern: &str, tokens: &[Token]) -> bool {
        let threshold = self.config.repetition_threshold;

        // `x{25}`, `\w{3,40}`: a count too large to parse is excessive too
        let counted = self.counted_repetition.captures_iter(pattern).any(|caps| {
            [caps.get(1), caps.get(2)]
                .into_iter()
                .flatten()
                .filter(|m| !m.as_str().is_empty())
                .any(|m| m.as_str().parse::<usize>().map_or(true, |n| n >= threshold))
        });
        if counted {
            return true;
        }

        // Literal runs like `aaaaaaaaaaaaaaaaaaaa`
        let mut run = 0;
        let mut previous = None;
        for token in tokens {
            match *token {
                Token::Plain(c) if c.is_alphanumeric() || c == '_' => {
                    run = if previous == Some(c) { run + 1 } else { 1 };
                    previous = Some(c);
                    if run >= threshold {
                        return true;
                    }
                }
                _ => {
                    run = 0;
                    previous = None;
                }
            }
        }

        false
    }
}

/// Deepest nesting of unescaped parentheses
fn group_depth(tokens: &[Token]) -> usize {
    let mut depth: usize = 0;
    let mut deepest = 0;

    for token in tokens {
        match token {
            Token::Plain('(') => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            Token::Plain(')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    deepest
}

/// Number of `|`-separated branches that carry an unbounded quantifier.
/// Zero when the pattern has no alternation at all.
fn quantified_alternatives(tokens: &[Token]) -> usize {
    if !tokens.contains(&Token::Plain('|')) {
        return 0;
    }

    let mut count = 0;
    let mut branch_quantified = false;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Plain('|') => {
                if branch_quantified {
                    count += 1;
                }
                branch_quantified = false;
            }
            Token::Plain('*') | Token::Plain('+') => branch_quantified = true,
            Token::Plain('{') if is_open_ended_count(&tokens[i + 1..]) => {
                branch_quantified = true
            }
            _ => {}
        }
    }
    if branch_quantified {
        count += 1;
    }

    count
}

/// Whether tokens following a `{` read `n,}`
fn is_open_ended_count(rest: &[Token]) -> bool {
    let digits = rest
        .iter()
        .take_while(|t| matches!(t, Token::Plain(c) if c.is_ascii_digit()))
        .count();

    digits > 0
        && rest.get(digits) == Some(&Token::Plain(','))
        && rest.get(digits + 1) == Some(&Token::Plain('}'))
}

// ============================================================================
// FLAGS
// ============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Flags {
    case_insensitive: bool,
    multi_line: bool,
    dot_all: bool,
    ignore_whitespace: bool,
}

fn parse_flags(flags: &str) -> Result<Flags, Rejection> {
    let mut parsed = Flags::default();

    for flag in flags.chars() {
        match flag {
            'i' => parsed.case_insensitive = true,
            'm' => parsed.multi_line = true,
            's' => parsed.dot_all = true,
            'x' => parsed.ignore_whitespace = true,
            // Replacement is always global and matching always Unicode
            'g' | 'u' => {}
            other => {
                return Err(Rejection::SyntaxError(format!("unknown flag {:?}", other)));
            }
        }
    }

    Ok(parsed)
}

// ============================================================================
// PATTERN GUARD
// ============================================================================

pub struct PatternGuard {
    max_pattern_length: usize,
    max_input_length: usize,
    regex_size_limit: usize,
    classifier: DangerClassifier,
    prober: PerformanceProber,
}

impl PatternGuard {
    pub fn new(config: &SearchConfig, clock: Arc<dyn Clock>) -> Result<Self, SearchError> {
        Ok(PatternGuard {
            max_pattern_length: config.max_pattern_length,
            max_input_length: config.max_input_length,
            regex_size_limit: config.regex_size_limit,
            classifier: DangerClassifier::new(&config.danger)?,
            prober: PerformanceProber::new(config, clock),
        })
    }

    /// Validate, compile and probe a pattern.
    /// Every rejection is logged and returned; none of them is fatal.
    pub fn compile(&self, pattern: &str, flags: &str) -> Result<ApprovedPattern, Rejection> {
        self.check_and_probe(pattern, flags).inspect_err(|rejection| {
            warn!(
                reason = rejection.reason(),
                pattern = %pattern,
                "Search pattern rejected: {}",
                rejection
            );
        })
    }

    fn check_and_probe(&self, pattern: &str, flags: &str) -> Result<ApprovedPattern, Rejection> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(Rejection::EmptyPattern);
        }

        let length = trimmed.chars().count();
        if length > self.max_pattern_length {
            return Err(Rejection::TooLong {
                length,
                max: self.max_pattern_length,
            });
        }

        if let Some(signal) = self.classifier.classify(trimmed) {
            return Err(Rejection::DangerousPattern(signal));
        }

        let candidate = self.build(trimmed, parse_flags(flags)?)?;
        self.prober.probe(candidate)
    }

    fn build(&self, pattern: &str, flags: Flags) -> Result<CandidatePattern, Rejection> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .ignore_whitespace(flags.ignore_whitespace)
            .size_limit(self.regex_size_limit)
            .dfa_size_limit(self.regex_size_limit)
            .build()
            .map_err(|e| Rejection::SyntaxError(e.to_string()))?;

        Ok(CandidatePattern::new(regex, self.max_input_length))
    }
}

// ============================================================================
// TESTS
// ============================================================================
