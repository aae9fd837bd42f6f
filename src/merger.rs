//! Multi-export merging
//!
//! The exporter re-delivers overlapping windows (retries, manual re-syncs) and
//! also delivers bucketed contributions, e.g. one active-energy sample per
//! five minutes. Merging keeps every sample except exact repeats of one already
//! accumulated: same instant and a value within `DUPLICATE_EPSILON`. Equal
//! values at different instants are distinct contributions and are kept.

use crate::types::{Export, RawMetric, RawSample};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Absolute tolerance under which two same-instant values are one sample
pub const DUPLICATE_EPSILON: f64 = 1e-4;

/// Default export window in days
pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// Per-metric sample sets merged across exports, keyed by raw name.
///
/// Iteration follows the order in which names were first seen, which keeps
/// name resolution deterministic.
#[derive(Debug, Clone, Default)]
pub struct MergedMetrics {
    metrics: Vec<RawMetric>,
    index: HashMap<String, usize>,
}

impl MergedMetrics {
    pub fn get(&self, name: &str) -> Option<&RawMetric> {
        self.index.get(name).map(|&i| &self.metrics[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawMetric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Total samples across all merged metrics
    pub fn sample_count(&self) -> usize {
        self.metrics.iter().map(|m| m.samples.len()).sum()
    }

    /// Consume into a name → metric map
    pub fn into_map(self) -> HashMap<String, RawMetric> {
        self.metrics
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect()
    }

    fn absorb(&mut self, metric: &RawMetric) {
        match self.index.get(&metric.name) {
            Some(&i) => {
                let existing = &mut self.metrics[i];
                let added = append_distinct(&mut existing.samples, &metric.samples);
                existing.samples.sort_by_key(|s| s.timestamp);
                debug!(
                    metric = %metric.name,
                    added,
                    skipped = metric.samples.len() - added,
                    "merged metric samples"
                );
            }
            None => {
                let mut seeded = metric.clone();
                seeded.samples.sort_by_key(|s| s.timestamp);
                self.index.insert(metric.name.clone(), self.metrics.len());
                self.metrics.push(seeded);
            }
        }
    }
}

impl<'a> IntoIterator for &'a MergedMetrics {
    type Item = &'a RawMetric;
    type IntoIter = std::slice::Iter<'a, RawMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

/// Merges export payloads into one deduplicated sample set per metric name
pub struct ExportMerger;

impl ExportMerger {
    /// Merge `exports` in the order given.
    ///
    /// The first occurrence of a name seeds the merged metric, including its
    /// unit. Metrics without samples are ignored.
    pub fn merge(exports: &[Export]) -> MergedMetrics {
        let mut merged = MergedMetrics::default();

        for export in exports {
            for metric in &export.metrics {
                if metric.samples.is_empty() {
                    continue;
                }
                merged.absorb(metric);
            }
        }

        debug!(
            exports = exports.len(),
            metrics = merged.len(),
            samples = merged.sample_count(),
            "merged exports"
        );
        merged
    }
}

/// Append every sample of `incoming` that is not an exact duplicate of one
/// already in `accumulated`. Returns the number appended.
fn append_distinct(accumulated: &mut Vec<RawSample>, incoming: &[RawSample]) -> usize {
    let mut seen: HashMap<DateTime<FixedOffset>, Vec<f64>> = HashMap::new();
    for sample in accumulated.iter() {
        seen.entry(sample.timestamp).or_default().push(sample.value);
    }

    let mut added = 0;
    for sample in incoming {
        let values = seen.entry(sample.timestamp).or_default();
        let duplicate = values
            .iter()
            .any(|v| (v - sample.value).abs() < DUPLICATE_EPSILON);
        if !duplicate {
            values.push(sample.value);
            accumulated.push(sample.clone());
            added += 1;
        }
    }
    added
}

/// Recency filter over exports by ingestion time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWindow {
    days: u32,
}

impl Default for ExportWindow {
    fn default() -> Self {
        Self::last_days(DEFAULT_WINDOW_DAYS)
    }
}

impl ExportWindow {
    pub fn last_days(days: u32) -> Self {
        Self { days }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Keep exports ingested no earlier than `days` before `now`
    pub fn retain(&self, exports: Vec<Export>, now: DateTime<Utc>) -> Vec<Export> {
        let cutoff = now - chrono::Duration::days(i64::from(self.days));
        let before = exports.len();
        let kept: Vec<Export> = exports
            .into_iter()
            .filter(|e| e.ingested_at >= cutoff)
            .collect();
        debug!(
            window_days = self.days,
            dropped = before - kept.len(),
            "applied export window"
        );
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0)
            .unwrap()
            .fixed_offset()
    }

    fn export(metrics: Vec<RawMetric>) -> Export {
        Export {
            ingested_at: Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap(),
            metrics,
        }
    }

    fn calories(samples: &[(u32, u32, f64)]) -> RawMetric {
        RawMetric::new(
            "active_energy",
            "kcal",
            samples
                .iter()
                .map(|&(h, m, v)| RawSample::new(at(h, m), v))
                .collect(),
        )
    }

    fn distinct(metric: &RawMetric) -> HashSet<(i64, u64)> {
        metric
            .samples
            .iter()
            .map(|s| (s.timestamp.timestamp(), s.value.to_bits()))
            .collect()
    }

    #[test]
    fn test_merge_is_idempotent() {
        let e = export(vec![calories(&[(8, 0, 5.0), (8, 5, 3.0), (9, 0, 10.0)])]);

        let once = ExportMerger::merge(std::slice::from_ref(&e));
        let twice = ExportMerger::merge(&[e.clone(), e]);

        let a = once.get("active_energy").unwrap();
        let b = twice.get("active_energy").unwrap();
        assert_eq!(a.samples.len(), 3);
        assert_eq!(distinct(a), distinct(b));
        assert_eq!(b.samples.len(), 3);
    }

    #[test]
    fn test_equal_values_at_different_times_are_kept() {
        let first = export(vec![calories(&[(8, 0, 4.0)])]);
        let second = export(vec![calories(&[(8, 5, 4.0), (8, 0, 4.00001)])]);

        let merged = ExportMerger::merge(&[first, second]);
        let metric = merged.get("active_energy").unwrap();
        // 08:05 is a new contribution, 08:00 within epsilon is a repeat
        assert_eq!(metric.samples.len(), 2);
    }

    #[test]
    fn test_same_instant_different_value_is_kept() {
        let first = export(vec![calories(&[(8, 0, 4.0)])]);
        let second = export(vec![calories(&[(8, 0, 4.5)])]);

        let merged = ExportMerger::merge(&[first, second]);
        assert_eq!(merged.get("active_energy").unwrap().samples.len(), 2);
    }

    #[test]
    fn test_samples_sorted_and_unit_from_first() {
        let first = export(vec![calories(&[(12, 0, 1.0)])]);
        let mut later = calories(&[(9, 0, 2.0), (7, 0, 3.0)]);
        later.unit = "kJ".to_string();
        let second = export(vec![later]);

        let merged = ExportMerger::merge(&[first, second]);
        let metric = merged.get("active_energy").unwrap();
        assert_eq!(metric.unit, "kcal");
        let hours: Vec<i64> = metric
            .samples
            .iter()
            .map(|s| s.timestamp.timestamp())
            .collect();
        let mut sorted = hours.clone();
        sorted.sort();
        assert_eq!(hours, sorted);
    }

    #[test]
    fn test_first_seen_order_and_empty_metrics_ignored() {
        let e = export(vec![
            RawMetric::new("empty", "count", Vec::new()),
            RawMetric::new("steps", "count", vec![RawSample::new(at(8, 0), 100.0)]),
            calories(&[(8, 0, 5.0)]),
        ]);
        let merged = ExportMerger::merge(&[e]);
        let names: Vec<&str> = merged.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["steps", "active_energy"]);
        assert!(merged.get("empty").is_none());
    }

    #[test]
    fn test_empty_input() {
        let merged = ExportMerger::merge(&[]);
        assert!(merged.is_empty());
        assert!(merged.into_map().is_empty());
    }

    #[test]
    fn test_export_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let recent = Export {
            ingested_at: now - chrono::Duration::days(3),
            metrics: Vec::new(),
        };
        let stale = Export {
            ingested_at: now - chrono::Duration::days(40),
            metrics: Vec::new(),
        };

        let kept = ExportWindow::last_days(30).retain(vec![recent.clone(), stale], now);
        assert_eq!(kept, vec![recent]);
    }
}
