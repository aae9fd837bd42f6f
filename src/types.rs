//! Core types for the Healthsync Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw exports, merged metrics, daily records, statistics and the
//! chart-ready time series.

use crate::catalog::CanonicalMetric;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observation of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Observation instant, with the offset the exporter reported
    pub timestamp: DateTime<FixedOffset>,
    pub value: f64,
}

impl RawSample {
    pub fn new(timestamp: DateTime<FixedOffset>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A named metric as the exporter delivered it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetric {
    /// Free-form exporter name (e.g. "step_count")
    pub name: String,
    /// Free-form unit string (e.g. "count", "mi", "kcal")
    pub unit: String,
    /// Samples in delivery order
    pub samples: Vec<RawSample>,
}

impl RawMetric {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, samples: Vec<RawSample>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            samples,
        }
    }
}

/// One ingested payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    /// When the payload was received by the store
    pub ingested_at: DateTime<Utc>,
    /// Metrics in the payload, unique by name
    pub metrics: Vec<RawMetric>,
}

/// Normalized health values for one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    /// Local calendar day (YYYY-MM-DD)
    pub date: NaiveDate,

    // Activity
    pub active_calories: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub stand_hours: Option<f64>,
    pub steps: Option<f64>,
    /// Meters
    pub distance: Option<f64>,
    pub flights_climbed: Option<f64>,
    /// km/h, derived from distance and exercise minutes
    pub speed: Option<f64>,

    // Heart
    pub resting_heart_rate: Option<f64>,
    pub average_heart_rate: Option<f64>,
    pub min_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub heart_rate_variability: Option<f64>,

    // Sleep (minutes)
    pub time_in_bed: Option<f64>,
    pub time_asleep: Option<f64>,

    // Cardio fitness
    pub vo2_max: Option<f64>,
}

impl DailyRecord {
    /// A record for `date` with every value missing
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            active_calories: None,
            exercise_minutes: None,
            stand_hours: None,
            steps: None,
            distance: None,
            flights_climbed: None,
            speed: None,
            resting_heart_rate: None,
            average_heart_rate: None,
            min_heart_rate: None,
            max_heart_rate: None,
            heart_rate_variability: None,
            time_in_bed: None,
            time_asleep: None,
            vo2_max: None,
        }
    }

    pub fn get(&self, metric: CanonicalMetric) -> Option<f64> {
        match metric {
            CanonicalMetric::ActiveCalories => self.active_calories,
            CanonicalMetric::ExerciseMinutes => self.exercise_minutes,
            CanonicalMetric::StandHours => self.stand_hours,
            CanonicalMetric::Steps => self.steps,
            CanonicalMetric::Distance => self.distance,
            CanonicalMetric::FlightsClimbed => self.flights_climbed,
            CanonicalMetric::RestingHeartRate => self.resting_heart_rate,
            CanonicalMetric::AverageHeartRate => self.average_heart_rate,
            CanonicalMetric::MinHeartRate => self.min_heart_rate,
            CanonicalMetric::MaxHeartRate => self.max_heart_rate,
            CanonicalMetric::HeartRateVariability => self.heart_rate_variability,
            CanonicalMetric::TimeInBed => self.time_in_bed,
            CanonicalMetric::TimeAsleep => self.time_asleep,
            CanonicalMetric::VO2Max => self.vo2_max,
        }
    }

    pub fn set(&mut self, metric: CanonicalMetric, value: Option<f64>) {
        let slot = match metric {
            CanonicalMetric::ActiveCalories => &mut self.active_calories,
            CanonicalMetric::ExerciseMinutes => &mut self.exercise_minutes,
            CanonicalMetric::StandHours => &mut self.stand_hours,
            CanonicalMetric::Steps => &mut self.steps,
            CanonicalMetric::Distance => &mut self.distance,
            CanonicalMetric::FlightsClimbed => &mut self.flights_climbed,
            CanonicalMetric::RestingHeartRate => &mut self.resting_heart_rate,
            CanonicalMetric::AverageHeartRate => &mut self.average_heart_rate,
            CanonicalMetric::MinHeartRate => &mut self.min_heart_rate,
            CanonicalMetric::MaxHeartRate => &mut self.max_heart_rate,
            CanonicalMetric::HeartRateVariability => &mut self.heart_rate_variability,
            CanonicalMetric::TimeInBed => &mut self.time_in_bed,
            CanonicalMetric::TimeAsleep => &mut self.time_asleep,
            CanonicalMetric::VO2Max => &mut self.vo2_max,
        };
        *slot = value;
    }

    /// True when no canonical metric has a value for this day
    pub fn is_blank(&self) -> bool {
        CanonicalMetric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Min/max/mean of one metric across all days that have it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStat {
    pub metric: CanonicalMetric,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub unit: String,
}

/// Raw daily value paired with its smoothed trend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesValue {
    pub raw: Option<f64>,
    pub trend: Option<f64>,
}

/// Chart point for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    /// One entry per tracked metric
    pub values: BTreeMap<CanonicalMetric, SeriesValue>,
}

/// Activity ring completion for one day (0-1 per ring)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingProgress {
    pub date: NaiveDate,
    #[serde(rename = "move")]
    pub move_ring: Option<f64>,
    pub exercise: Option<f64>,
    pub stand: Option<f64>,
}

/// Everything the dashboard needs, derived from one export snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Daily records, oldest first
    pub days: Vec<DailyRecord>,
    pub statistics: Vec<HistoricalStat>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub rings: Vec<RingProgress>,
    /// Index into `days` of the day to show first
    pub selected_index: Option<usize>,
}

/// Who computed a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded dashboard with producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub producer: Producer,
    /// RFC 3339 instant of computation
    pub computed_at_utc: String,
    /// Zone used for day bucketing, as configured
    pub timezone: String,
    pub trend_window: usize,
    #[serde(flatten)]
    pub dashboard: Dashboard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_cover_every_metric() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut record = DailyRecord::empty(date);
        assert!(record.is_blank());

        for (i, metric) in CanonicalMetric::ALL.iter().enumerate() {
            record.set(*metric, Some(i as f64));
        }
        for (i, metric) in CanonicalMetric::ALL.iter().enumerate() {
            assert_eq!(record.get(*metric), Some(i as f64));
        }
        assert!(!record.is_blank());
    }

    #[test]
    fn test_daily_record_json_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut record = DailyRecord::empty(date);
        record.steps = Some(8500.0);
        record.vo2_max = Some(42.5);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["date"], "2024-01-15");
        assert_eq!(value["steps"], 8500.0);
        assert_eq!(value["vo2Max"], 42.5);
        assert!(value["activeCalories"].is_null());
    }
}
