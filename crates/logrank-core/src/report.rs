use crate::aggregate::AggregationState;
use serde::{Deserialize, Serialize};

/// Timing statistics for one URL.
///
/// All float fields are rounded to three decimals, half away from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub url: String,
    pub count: u64,
    pub count_percentage: f64,
    pub time_sum: f64,
    pub time_percent: f64,
    pub time_avg: f64,
    pub time_max: f64,
    pub time_med: f64,
}

/// Turns aggregated request times into the ranked report table.
pub struct ReportBuilder {
    limit: usize,
}

impl ReportBuilder {
    /// `limit` is the number of rows kept; zero is raised to one
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// Build rows sorted by `time_sum`, largest first.
    ///
    /// The sort is stable: URLs with equal `time_sum` stay in the order they
    /// were first seen in the log.
    pub fn build(&self, state: AggregationState) -> Vec<ReportRow> {
        tracing::debug!("Building report from {} URLs", state.buckets().len());

        let total_matched = state.matched as f64;
        let total_duration = state.total_duration;

        let mut rows: Vec<ReportRow> = state
            .into_buckets()
            .into_iter()
            .filter(|bucket| !bucket.durations.is_empty())
            .map(|bucket| {
                let count = bucket.durations.len();
                let time_sum: f64 = bucket.durations.iter().sum();
                let time_max = bucket
                    .durations
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);

                ReportRow {
                    count: count as u64,
                    count_percentage: round3(count as f64 / (total_matched / 100.0)),
                    time_sum: round3(time_sum),
                    time_percent: round3(time_sum / (total_duration / 100.0)),
                    time_avg: round3(time_sum / count as f64),
                    time_max: round3(time_max),
                    time_med: round3(median(bucket.durations)),
                    url: bucket.url,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.time_sum.total_cmp(&a.time_sum));
        rows.truncate(self.limit);

        tracing::info!("Report contains {} rows", rows.len());
        rows
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Element at index `n / 2` of the ascending-sorted values.
///
/// For an even count this is the upper of the two middle values, not their mean.
pub fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}

/// Round to three decimals, ties away from zero.
///
/// Rounds `value * 1000`, so a value just below a tie whose product lands on
/// the tie is rounded away from zero too.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
