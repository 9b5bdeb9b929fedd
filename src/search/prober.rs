// ⏱️ Performance Prober - times a compiled pattern against fixed samples
//
// The budget is checked between probe runs. A single run cannot be
// interrupted, so one pathological run may overshoot the budget before the
// next check notices. Callers needing hard cancellation must add it above.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::pattern::{ApprovedPattern, CandidatePattern};
use crate::config::SearchConfig;
use crate::error::Rejection;

// ============================================================================
// CLOCK
// ============================================================================

/// Monotonic time source for the prober
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock: every call to `now` advances time by `step`.
/// Lets tests pin down exactly when the budget runs out.
#[derive(Debug)]
pub struct SteppingClock {
    origin: Instant,
    step: Duration,
    ticks: AtomicU32,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        SteppingClock {
            origin: Instant::now(),
            step,
            ticks: AtomicU32::new(0),
        }
    }

    /// Number of times the clock has been read
    pub fn reads(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.origin + self.step * tick
    }
}

// ============================================================================
// PROBER
// ============================================================================

pub struct PerformanceProber {
    timeout: Duration,
    corpus: Vec<String>,
    clock: Arc<dyn Clock>,
}

impl PerformanceProber {
    pub fn new(config: &SearchConfig, clock: Arc<dyn Clock>) -> Self {
        PerformanceProber {
            timeout: config.probe_timeout(),
            corpus: config.probe_corpus.clone(),
            clock,
        }
    }

    /// Run the pattern over every probe sample, aborting as soon as the
    /// elapsed time since the first sample exceeds the budget.
    pub fn probe(&self, candidate: CandidatePattern) -> Result<ApprovedPattern, Rejection> {
        let start = self.clock.now();

        for sample in &self.corpus {
            candidate.is_match(sample).map_err(|e| match e {
                Rejection::RuntimeError(_) => e,
                other => Rejection::RuntimeError(other.to_string()),
            })?;

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed > self.timeout {
                return Err(Rejection::TooSlow {
                    elapsed_ms: elapsed.as_millis(),
                    budget_ms: self.timeout.as_millis(),
                });
            }
        }

        Ok(ApprovedPattern::approve(candidate))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn candidate(pattern: &str) -> CandidatePattern {
        CandidatePattern::new(Regex::new(pattern).unwrap(), 10_000)
    }

    #[test]
    fn test_fast_pattern_is_approved() {
        let prober = PerformanceProber::new(&SearchConfig::default(), Arc::new(SystemClock));

        let approved = prober.probe(candidate("coffee|tea")).unwrap();
        assert_eq!(approved.as_str(), "coffee|tea");
    }

    #[test]
    fn test_budget_exceeded_aborts_early() {
        // 6 samples, 20ms per clock read, 50ms budget: third check reads 60ms
        let clock = Arc::new(SteppingClock::new(Duration::from_millis(20)));
        let prober = PerformanceProber::new(&SearchConfig::default(), clock.clone());

        let result = prober.probe(candidate("a"));

        assert_eq!(
            result.unwrap_err(),
            Rejection::TooSlow {
                elapsed_ms: 60,
                budget_ms: 50
            }
        );
        // start + three checks, remaining samples skipped
        assert_eq!(clock.reads(), 4);
    }

    #[test]
    fn test_budget_boundary_is_inclusive() {
        // Last check lands exactly on 60ms with a 60ms budget
        let clock = Arc::new(SteppingClock::new(Duration::from_millis(10)));
        let config = SearchConfig {
            probe_timeout_ms: 60,
            ..SearchConfig::default()
        };
        let prober = PerformanceProber::new(&config, clock);

        assert!(prober.probe(candidate("a")).is_ok());
    }

    #[test]
    fn test_runtime_fault_in_probe() {
        let config = SearchConfig {
            max_input_length: 20,
            ..SearchConfig::default()
        };
        let prober = PerformanceProber::new(&config, Arc::new(SystemClock));
        let small_cap = CandidatePattern::new(Regex::new("a").unwrap(), config.max_input_length);

        // The 50-char probe sample trips the input cap
        assert!(matches!(
            prober.probe(small_cap),
            Err(Rejection::RuntimeError(_))
        ));
    }

    #[test]
    fn test_empty_corpus_approves() {
        let config = SearchConfig {
            probe_corpus: Vec::new(),
            ..SearchConfig::default()
        };
        let prober = PerformanceProber::new(&config, Arc::new(SystemClock));

        assert!(prober.probe(candidate("x")).is_ok());
    }
}
