//! Daily aggregation
//!
//! Folds a metric's samples into one value per local calendar day. Bucketed
//! contributions (calories, steps) are summed, rates (heart rate) averaged,
//! extremes take min/max. Stand time is special: the exporter reports minutes
//! stood in small buckets, and a "stand hour" is a clock hour in which those
//! minutes add up to at least one.
//!
//! No unit conversion happens here; see `normalizer`.

use crate::catalog::AggregationPolicy;
use crate::timezone::LocalZone;
use crate::types::{RawMetric, RawSample};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minutes of standing within one clock hour for the hour to count
pub const STAND_MINUTE_THRESHOLD: f64 = 1.0;

/// What a day with stand samples but no qualifying hour reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandHoursZero {
    /// Report no value, indistinguishable from a day without samples
    #[default]
    Null,
    /// Report zero hours
    Zero,
}

/// Aggregates samples into local-day values
#[derive(Debug, Clone, Default)]
pub struct DailyAggregator {
    zone: LocalZone,
    stand_zero: StandHoursZero,
}

impl DailyAggregator {
    pub fn new(zone: LocalZone) -> Self {
        Self {
            zone,
            stand_zero: StandHoursZero::default(),
        }
    }

    pub fn with_stand_hours_zero(mut self, policy: StandHoursZero) -> Self {
        self.stand_zero = policy;
        self
    }

    pub fn zone(&self) -> &LocalZone {
        &self.zone
    }

    /// Aggregate the samples of `metric` that fall on `day`.
    ///
    /// Returns None when no sample falls on that day.
    pub fn aggregate(
        &self,
        metric: &RawMetric,
        day: NaiveDate,
        policy: AggregationPolicy,
    ) -> Option<f64> {
        let samples: Vec<&RawSample> = metric
            .samples
            .iter()
            .filter(|s| self.zone.date_of(&s.timestamp) == day)
            .collect();
        self.reduce(&samples, policy)
    }

    /// Group samples by local day
    pub fn bucket_by_day<'a>(&self, metric: &'a RawMetric) -> BTreeMap<NaiveDate, Vec<&'a RawSample>> {
        let mut buckets: BTreeMap<NaiveDate, Vec<&'a RawSample>> = BTreeMap::new();
        for sample in &metric.samples {
            buckets
                .entry(self.zone.date_of(&sample.timestamp))
                .or_default()
                .push(sample);
        }
        buckets
    }

    /// Aggregate every day `metric` has samples for. Days that aggregate to
    /// no value are left out.
    pub fn daily_values(
        &self,
        metric: &RawMetric,
        policy: AggregationPolicy,
    ) -> BTreeMap<NaiveDate, f64> {
        self.bucket_by_day(metric)
            .into_iter()
            .filter_map(|(day, samples)| self.reduce(&samples, policy).map(|v| (day, v)))
            .collect()
    }

    /// Fold one day's samples under `policy`
    pub fn reduce(&self, samples: &[&RawSample], policy: AggregationPolicy) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }

        let values = samples.iter().map(|s| s.value);
        match policy {
            AggregationPolicy::Sum => Some(values.sum()),
            AggregationPolicy::Avg => Some(values.sum::<f64>() / samples.len() as f64),
            AggregationPolicy::Min => Some(values.fold(f64::INFINITY, f64::min)),
            AggregationPolicy::Max => Some(values.fold(f64::NEG_INFINITY, f64::max)),
            AggregationPolicy::HourCount => self.count_stand_hours(samples),
        }
    }

    fn count_stand_hours(&self, samples: &[&RawSample]) -> Option<f64> {
        let mut minutes_by_hour: BTreeMap<u32, f64> = BTreeMap::new();
        for sample in samples {
            *minutes_by_hour
                .entry(self.zone.hour_of(&sample.timestamp))
                .or_insert(0.0) += sample.value;
        }

        let hours = minutes_by_hour
            .values()
            .filter(|minutes| **minutes >= STAND_MINUTE_THRESHOLD)
            .count();

        match (hours, self.stand_zero) {
            (0, StandHoursZero::Null) => None,
            (0, StandHoursZero::Zero) => Some(0.0),
            (n, _) => Some(n as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn zone() -> LocalZone {
        LocalZone::Fixed(FixedOffset::west_opt(8 * 3600).unwrap())
    }

    fn local(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, day, hour, minute, 0)
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn metric(samples: &[(u32, u32, u32, f64)]) -> RawMetric {
        RawMetric::new(
            "m",
            "count",
            samples
                .iter()
                .map(|&(d, h, m, v)| RawSample::new(local(d, h, m), v))
                .collect(),
        )
    }

    #[test]
    fn test_sum_is_additive_per_day() {
        let agg = DailyAggregator::new(zone());
        let m = metric(&[(1, 8, 0, 5.0), (1, 20, 0, 3.0), (2, 9, 0, 10.0)]);

        assert_eq!(agg.aggregate(&m, day(1), AggregationPolicy::Sum), Some(8.0));
        assert_eq!(agg.aggregate(&m, day(2), AggregationPolicy::Sum), Some(10.0));
        assert_eq!(agg.aggregate(&m, day(3), AggregationPolicy::Sum), None);
    }

    #[test]
    fn test_avg_min_max() {
        let agg = DailyAggregator::new(zone());
        let m = metric(&[(1, 8, 0, 60.0), (1, 9, 0, 80.0), (1, 10, 0, 70.0)]);

        assert_eq!(agg.aggregate(&m, day(1), AggregationPolicy::Avg), Some(70.0));
        assert_eq!(agg.aggregate(&m, day(1), AggregationPolicy::Min), Some(60.0));
        assert_eq!(agg.aggregate(&m, day(1), AggregationPolicy::Max), Some(80.0));
    }

    #[test]
    fn test_days_follow_local_zone() {
        // 23:30 local on the 1st is 07:30 UTC on the 2nd
        let m = metric(&[(1, 23, 30, 4.0)]);
        let local_agg = DailyAggregator::new(zone());
        let utc_agg = DailyAggregator::new(LocalZone::utc());

        assert_eq!(local_agg.aggregate(&m, day(1), AggregationPolicy::Sum), Some(4.0));
        assert_eq!(utc_agg.aggregate(&m, day(1), AggregationPolicy::Sum), None);
        assert_eq!(utc_agg.aggregate(&m, day(2), AggregationPolicy::Sum), Some(4.0));
    }

    #[test]
    fn test_stand_hours_counting() {
        let agg = DailyAggregator::new(zone());
        let m = metric(&[(1, 8, 0, 1.0), (1, 8, 30, 0.5), (1, 14, 0, 2.0)]);

        assert_eq!(
            agg.aggregate(&m, day(1), AggregationPolicy::HourCount),
            Some(2.0)
        );
    }

    #[test]
    fn test_stand_hours_sums_partial_minutes_within_hour() {
        let agg = DailyAggregator::new(zone());
        // 0.5 + 0.5 in hour 10 reaches the threshold, 0.9 in hour 11 does not
        let m = metric(&[(1, 10, 0, 0.5), (1, 10, 40, 0.5), (1, 11, 0, 0.9)]);

        assert_eq!(
            agg.aggregate(&m, day(1), AggregationPolicy::HourCount),
            Some(1.0)
        );
    }

    #[test]
    fn test_stand_hours_zero_policy() {
        let m = metric(&[(1, 8, 0, 0.2), (1, 9, 0, 0.3)]);

        let null_agg = DailyAggregator::new(zone());
        assert_eq!(
            null_agg.aggregate(&m, day(1), AggregationPolicy::HourCount),
            None
        );

        let zero_agg = DailyAggregator::new(zone()).with_stand_hours_zero(StandHoursZero::Zero);
        assert_eq!(
            zero_agg.aggregate(&m, day(1), AggregationPolicy::HourCount),
            Some(0.0)
        );
        // No samples at all is still no value
        assert_eq!(
            zero_agg.aggregate(&m, day(2), AggregationPolicy::HourCount),
            None
        );
    }

    #[test]
    fn test_daily_values_matches_aggregate() {
        let agg = DailyAggregator::new(zone());
        let m = metric(&[(1, 8, 0, 5.0), (1, 9, 0, 3.0), (3, 9, 0, 10.0)]);

        let values = agg.daily_values(&m, AggregationPolicy::Sum);
        assert_eq!(values.len(), 2);
        for (d, v) in &values {
            assert_eq!(agg.aggregate(&m, *d, AggregationPolicy::Sum), Some(*v));
        }
    }
}
