//! Trend lines
//!
//! Centered rolling averages over daily records, used to smooth day-to-day
//! noise in charts. A day only gets a trend value when it has its own value;
//! neighbours never fill in a missing day.

use crate::catalog::CanonicalMetric;
use crate::types::{DailyRecord, SeriesValue, TimeSeriesPoint};
use std::collections::BTreeMap;

/// Default trend window in days
pub const DEFAULT_TREND_WINDOW: usize = 7;

/// Metrics charted by default
pub const DEFAULT_TRACKED: [CanonicalMetric; 4] = [
    CanonicalMetric::ActiveCalories,
    CanonicalMetric::Steps,
    CanonicalMetric::TimeAsleep,
    CanonicalMetric::VO2Max,
];

/// Trend values per metric, aligned index-for-index with the records
pub type TrendLines = BTreeMap<CanonicalMetric, Vec<Option<f64>>>;

/// Trend line for every canonical metric.
///
/// Empty when `records` is empty.
pub fn trends(records: &[DailyRecord], window: usize) -> TrendLines {
    if records.is_empty() {
        return TrendLines::new();
    }
    CanonicalMetric::ALL
        .into_iter()
        .map(|metric| (metric, metric_trend(records, metric, window)))
        .collect()
}

/// Trend line for one metric
pub fn metric_trend(records: &[DailyRecord], metric: CanonicalMetric, window: usize) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = records.iter().map(|r| r.get(metric)).collect();
    values
        .iter()
        .enumerate()
        .map(|(i, own)| own.and_then(|_| rolling_average(&values, window, i)))
        .collect()
}

/// Mean of the non-null values in `[index - window/2, index + ceil(window/2))`,
/// clipped to the slice.
pub fn rolling_average(values: &[Option<f64>], window: usize, index: usize) -> Option<f64> {
    let start = index.saturating_sub(window / 2);
    let end = index.saturating_add(window - window / 2).min(values.len());
    if start >= end {
        return None;
    }

    let present: Vec<f64> = values[start..end].iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Chart points pairing raw and trend values for the `tracked` metrics
pub fn time_series(
    records: &[DailyRecord],
    window: usize,
    tracked: &[CanonicalMetric],
) -> Vec<TimeSeriesPoint> {
    let lines: BTreeMap<CanonicalMetric, Vec<Option<f64>>> = tracked
        .iter()
        .map(|&metric| (metric, metric_trend(records, metric, window)))
        .collect();

    records
        .iter()
        .enumerate()
        .map(|(i, record)| TimeSeriesPoint {
            date: record.date,
            values: lines
                .iter()
                .map(|(&metric, line)| {
                    (
                        metric,
                        SeriesValue {
                            raw: record.get(metric),
                            trend: line[i],
                        },
                    )
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records(steps: &[Option<f64>]) -> Vec<DailyRecord> {
        steps
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut r =
                    DailyRecord::empty(NaiveDate::from_ymd_opt(2024, 1, i as u32 + 1).unwrap());
                r.steps = *s;
                r
            })
            .collect()
    }

    #[test]
    fn test_centered_window() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)];
        // window 3 at index 2 covers [1, 4)
        assert_eq!(rolling_average(&values, 3, 2), Some(3.0));
        // clipped at the start: [0, 2)
        assert_eq!(rolling_average(&values, 3, 0), Some(1.5));
        // clipped at the end: [3, 5)
        assert_eq!(rolling_average(&values, 3, 4), Some(4.5));
    }

    #[test]
    fn test_even_window_is_left_heavy() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        // window 2 at index 2: [1, 3)
        assert_eq!(rolling_average(&values, 2, 2), Some(2.5));
    }

    #[test]
    fn test_nulls_skipped_inside_window() {
        let values = vec![Some(2.0), None, Some(4.0)];
        assert_eq!(rolling_average(&values, 7, 1), Some(3.0));
        assert_eq!(rolling_average(&[None, None], 7, 0), None);
    }

    #[test]
    fn test_trend_null_for_missing_day() {
        let recs = records(&[Some(100.0), None, Some(300.0)]);
        let line = metric_trend(&recs, CanonicalMetric::Steps, 7);
        assert_eq!(line, vec![Some(200.0), None, Some(200.0)]);
    }

    #[test]
    fn test_trends_aligned_and_empty() {
        let recs = records(&[Some(1.0), Some(2.0)]);
        let lines = trends(&recs, DEFAULT_TREND_WINDOW);
        assert_eq!(lines.len(), CanonicalMetric::ALL.len());
        assert!(lines.values().all(|l| l.len() == 2));
        assert!(lines[&CanonicalMetric::VO2Max].iter().all(|v| v.is_none()));

        assert!(trends(&[], 7).is_empty());
        assert!(time_series(&[], 7, &DEFAULT_TRACKED).is_empty());
    }

    #[test]
    fn test_huge_window_covers_whole_series() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(rolling_average(&values, usize::MAX, 0), Some(2.0));
        assert_eq!(rolling_average(&values, usize::MAX, 2), Some(2.0));

        let recs = records(&[Some(10.0), Some(20.0)]);
        assert_eq!(
            metric_trend(&recs, CanonicalMetric::Steps, usize::MAX),
            vec![Some(15.0), Some(15.0)]
        );
    }

    #[test]
    fn test_zero_window_yields_no_trend() {
        let recs = records(&[Some(1.0), Some(2.0)]);
        assert_eq!(
            metric_trend(&recs, CanonicalMetric::Steps, 0),
            vec![None, None]
        );
    }

    #[test]
    fn test_time_series_points() {
        let recs = records(&[Some(10.0), Some(20.0), None]);
        let points = time_series(&recs, 7, &[CanonicalMetric::Steps]);

        assert_eq!(points.len(), 3);
        let day2 = points[1].values[&CanonicalMetric::Steps];
        assert_eq!(day2.raw, Some(20.0));
        assert_eq!(day2.trend, Some(15.0));
        let day3 = points[2].values[&CanonicalMetric::Steps];
        assert_eq!(day3.raw, None);
        assert_eq!(day3.trend, None);
    }
}
