//! Daily record construction
//!
//! Ties merging, resolution, aggregation, normalization and derivation
//! together into one record per local calendar day.

use crate::aggregator::DailyAggregator;
use crate::catalog::CanonicalMetric;
use crate::features::FeatureDeriver;
use crate::merger::{ExportMerger, MergedMetrics};
use crate::normalizer::Normalizer;
use crate::resolver::MetricResolver;
use crate::timezone::LocalZone;
use crate::types::{DailyRecord, Export};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Builds normalized daily records from raw exports
#[derive(Debug, Clone, Default)]
pub struct DailyMetricsBuilder {
    aggregator: DailyAggregator,
}

impl DailyMetricsBuilder {
    pub fn new(aggregator: DailyAggregator) -> Self {
        Self { aggregator }
    }

    /// Merge `exports` and build one record per day, oldest first
    pub fn build(&self, exports: &[Export]) -> Vec<DailyRecord> {
        let merged = ExportMerger::merge(exports);
        self.build_from_merged(&merged)
    }

    /// Build records from an already merged sample set.
    ///
    /// A day gets a record when any merged metric, canonical or not, has a
    /// sample on it.
    pub fn build_from_merged(&self, merged: &MergedMetrics) -> Vec<DailyRecord> {
        let days = collect_days(merged, self.aggregator.zone());
        if days.is_empty() {
            return Vec::new();
        }

        let mut records: BTreeMap<NaiveDate, DailyRecord> = days
            .into_iter()
            .map(|day| (day, DailyRecord::empty(day)))
            .collect();

        for canonical in CanonicalMetric::ALL {
            let raw = match MetricResolver::resolve_canonical(merged, canonical) {
                Some(raw) => raw,
                None => continue,
            };

            for (day, value) in self.aggregator.daily_values(raw, canonical.policy()) {
                if let Some(record) = records.get_mut(&day) {
                    let normalized = Normalizer::normalize(canonical, value, &raw.unit);
                    record.set(canonical, Some(normalized));
                }
            }
        }

        let records: Vec<DailyRecord> = records
            .into_values()
            .map(|mut record| {
                FeatureDeriver::derive(&mut record);
                record
            })
            .collect();

        debug!(days = records.len(), "built daily records");
        records
    }
}

/// Every local day on which any merged metric has a sample
fn collect_days(merged: &MergedMetrics, zone: &LocalZone) -> BTreeSet<NaiveDate> {
    merged
        .iter()
        .flat_map(|metric| metric.samples.iter())
        .map(|sample| zone.date_of(&sample.timestamp))
        .collect()
}
