use crate::parser::LineParser;
use crate::{Error, Result};
use std::collections::HashMap;

/// Limits on unparsed lines. A run aborts only when both are exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchPolicy {
    pub max_count: u64,
    pub max_percent: u64,
}

impl MismatchPolicy {
    /// Build a policy, clamping the count to at least 1 and the percent to 1..=100
    pub fn new(max_count: i64, max_percent: i64) -> Self {
        Self {
            max_count: max_count.max(1) as u64,
            max_percent: max_percent.clamp(1, 100) as u64,
        }
    }

    fn is_exceeded(&self, mismatched: u64, total: u64) -> bool {
        mismatched > self.max_count && mismatch_percent(mismatched, total) > self.max_percent as f64
    }
}

impl Default for MismatchPolicy {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

fn mismatch_percent(mismatched: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    mismatched as f64 * 100.0 / total as f64
}

/// Request times of one URL, in the order they were read
#[derive(Debug, Clone, PartialEq)]
pub struct UrlBucket {
    pub url: String,
    pub durations: Vec<f64>,
}

/// Per-URL request times and line counters for one log file
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    buckets: Vec<UrlBucket>,
    index: HashMap<String, usize>,
    pub total: u64,
    pub matched: u64,
    pub mismatched: u64,
    pub total_duration: f64,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one matched request
    pub fn record(&mut self, url: &str, duration: f64) {
        self.total += 1;
        self.matched += 1;
        self.total_duration += duration;

        match self.index.get(url) {
            Some(&idx) => self.buckets[idx].durations.push(duration),
            None => {
                self.index.insert(url.to_string(), self.buckets.len());
                self.buckets.push(UrlBucket {
                    url: url.to_string(),
                    durations: vec![duration],
                });
            }
        }
    }

    /// Record one line that could not be parsed
    pub fn record_mismatch(&mut self) {
        self.total += 1;
        self.mismatched += 1;
    }

    /// URL buckets in first-seen order
    pub fn buckets(&self) -> &[UrlBucket] {
        &self.buckets
    }

    pub fn into_buckets(self) -> Vec<UrlBucket> {
        self.buckets
    }

    pub fn mismatch_percent(&self) -> f64 {
        mismatch_percent(self.mismatched, self.total)
    }
}

/// Folds a stream of log lines into an [`AggregationState`].
pub struct StreamAggregator<'a> {
    parser: &'a LineParser,
    policy: MismatchPolicy,
}

impl<'a> StreamAggregator<'a> {
    pub fn new(parser: &'a LineParser, policy: MismatchPolicy) -> Self {
        Self { parser, policy }
    }

    /// Consume `lines` until exhausted or the mismatch policy is breached.
    ///
    /// The policy is checked after every line, so an aborted run stops reading
    /// the source at the offending line.
    pub fn aggregate<I>(&self, lines: I) -> Result<AggregationState>
    where
        I: IntoIterator<Item = Result<String>>,
    {
        let mut state = AggregationState::new();

        for line in lines {
            let line = line?;
            match self.parser.parse(&line) {
                Some(record) => state.record(&record.url, record.duration),
                None => {
                    tracing::trace!("Unparsed line {}: {}", state.total + 1, line);
                    state.record_mismatch();
                }
            }

            if self.policy.is_exceeded(state.mismatched, state.total) {
                return Err(Error::MismatchExceeded {
                    mismatched: state.mismatched,
                    total: state.total,
                    percent: state.mismatch_percent(),
                });
            }
        }

        if state.matched == 0 || state.total_duration == 0.0 {
            return Err(Error::NoMatches {
                matched: state.matched,
                total_time: state.total_duration,
            });
        }

        if state.mismatched > 0 {
            tracing::warn!(
                "{} of {} lines could not be parsed ({:.2}%)",
                state.mismatched,
                state.total,
                state.mismatch_percent()
            );
        }
        tracing::info!(
            "Aggregated {} lines: {} matched, {} distinct URLs",
            state.total,
            state.matched,
            state.buckets.len()
        );

        Ok(state)
    }
}
