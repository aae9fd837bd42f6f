//! Historical statistics across all daily records

use crate::catalog::CanonicalMetric;
use crate::types::{DailyRecord, HistoricalStat};

/// Min/max/mean per canonical metric over the days that have a value.
///
/// Metrics without any value are omitted. Output follows catalog order.
pub fn historical_stats(records: &[DailyRecord]) -> Vec<HistoricalStat> {
    CanonicalMetric::ALL
        .into_iter()
        .filter_map(|metric| metric_stat(records, metric))
        .collect()
}

/// Statistics for a single metric, or None when no day has a value
pub fn metric_stat(records: &[DailyRecord], metric: CanonicalMetric) -> Option<HistoricalStat> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.get(metric)).collect();
    if values.is_empty() {
        return None;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    Some(HistoricalStat {
        metric,
        label: metric.label().to_string(),
        min,
        max,
        mean,
        unit: metric.unit().to_string(),
    })
}
