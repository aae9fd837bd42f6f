//! Canonical metric catalog
//!
//! The exporter names metrics however its current version likes
//! (`step_count`, `Steps`, `active_energy`...). The catalog fixes the set of
//! health concepts the pipeline understands and, for each one, the raw names
//! it may appear under, how its samples fold into a daily value, and the unit
//! the daily value is reported in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a day's samples collapse into a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Arithmetic sum (bucketed contributions such as calories or steps)
    Sum,
    /// Arithmetic mean (rates such as heart rate)
    Avg,
    /// Smallest sample
    Min,
    /// Largest sample
    Max,
    /// Number of clock hours whose summed minutes reach one minute
    HourCount,
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPolicy::Sum => "sum",
            AggregationPolicy::Avg => "avg",
            AggregationPolicy::Min => "min",
            AggregationPolicy::Max => "max",
            AggregationPolicy::HourCount => "hour_count",
        }
    }
}

/// Health concepts the pipeline understands, independent of exporter naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalMetric {
    ActiveCalories,
    ExerciseMinutes,
    StandHours,
    Steps,
    Distance,
    FlightsClimbed,
    RestingHeartRate,
    AverageHeartRate,
    MinHeartRate,
    MaxHeartRate,
    HeartRateVariability,
    TimeInBed,
    TimeAsleep,
    #[serde(rename = "vo2Max")]
    VO2Max,
}

impl CanonicalMetric {
    /// Every canonical metric, in reporting order
    pub const ALL: [CanonicalMetric; 14] = [
        CanonicalMetric::ActiveCalories,
        CanonicalMetric::ExerciseMinutes,
        CanonicalMetric::StandHours,
        CanonicalMetric::Steps,
        CanonicalMetric::Distance,
        CanonicalMetric::FlightsClimbed,
        CanonicalMetric::RestingHeartRate,
        CanonicalMetric::AverageHeartRate,
        CanonicalMetric::MinHeartRate,
        CanonicalMetric::MaxHeartRate,
        CanonicalMetric::HeartRateVariability,
        CanonicalMetric::TimeInBed,
        CanonicalMetric::TimeAsleep,
        CanonicalMetric::VO2Max,
    ];

    /// Raw exporter names, most preferred first
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalMetric::ActiveCalories => {
                &["active_energy_burned", "active_energy", "active_calories"]
            }
            CanonicalMetric::ExerciseMinutes => {
                &["apple_exercise_time", "exercise_time", "exercise_minutes"]
            }
            CanonicalMetric::StandHours => &["apple_stand_time", "stand_time", "stand_hours"],
            CanonicalMetric::Steps => &["step_count", "steps"],
            CanonicalMetric::Distance => {
                &["distance_walking_running", "distance", "walking_distance"]
            }
            CanonicalMetric::FlightsClimbed => &["flights_climbed", "flights"],
            CanonicalMetric::RestingHeartRate => &["resting_heart_rate", "resting_hr"],
            CanonicalMetric::AverageHeartRate => &["heart_rate", "average_heart_rate", "avg_hr"],
            CanonicalMetric::MinHeartRate => &["min_heart_rate", "heart_rate_min"],
            CanonicalMetric::MaxHeartRate => &["max_heart_rate", "heart_rate_max"],
            CanonicalMetric::HeartRateVariability => &["heart_rate_variability_sdnn", "hrv"],
            CanonicalMetric::TimeInBed => &["sleep_time_in_bed", "time_in_bed"],
            CanonicalMetric::TimeAsleep => &["sleep_time_asleep", "time_asleep", "sleep_duration"],
            CanonicalMetric::VO2Max => &["vo2_max", "cardio_fitness", "vo2max"],
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        match self {
            CanonicalMetric::ActiveCalories
            | CanonicalMetric::ExerciseMinutes
            | CanonicalMetric::Steps
            | CanonicalMetric::Distance
            | CanonicalMetric::FlightsClimbed
            | CanonicalMetric::TimeInBed
            | CanonicalMetric::TimeAsleep => AggregationPolicy::Sum,
            CanonicalMetric::StandHours => AggregationPolicy::HourCount,
            CanonicalMetric::RestingHeartRate
            | CanonicalMetric::AverageHeartRate
            | CanonicalMetric::HeartRateVariability
            | CanonicalMetric::VO2Max => AggregationPolicy::Avg,
            CanonicalMetric::MinHeartRate => AggregationPolicy::Min,
            CanonicalMetric::MaxHeartRate => AggregationPolicy::Max,
        }
    }

    /// Unit of the daily value after normalization
    pub fn unit(&self) -> &'static str {
        match self {
            CanonicalMetric::ActiveCalories => "kcal",
            CanonicalMetric::ExerciseMinutes => "min",
            CanonicalMetric::StandHours => "hrs",
            CanonicalMetric::Steps => "steps",
            CanonicalMetric::Distance => "m",
            CanonicalMetric::FlightsClimbed => "flights",
            CanonicalMetric::RestingHeartRate
            | CanonicalMetric::AverageHeartRate
            | CanonicalMetric::MinHeartRate
            | CanonicalMetric::MaxHeartRate => "bpm",
            CanonicalMetric::HeartRateVariability => "ms",
            CanonicalMetric::TimeInBed | CanonicalMetric::TimeAsleep => "min",
            CanonicalMetric::VO2Max => "ml/kg/min",
        }
    }

    /// Human-readable name for reports
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalMetric::ActiveCalories => "Active Calories",
            CanonicalMetric::ExerciseMinutes => "Exercise Minutes",
            CanonicalMetric::StandHours => "Stand Hours",
            CanonicalMetric::Steps => "Steps",
            CanonicalMetric::Distance => "Distance",
            CanonicalMetric::FlightsClimbed => "Flights Climbed",
            CanonicalMetric::RestingHeartRate => "Resting HR",
            CanonicalMetric::AverageHeartRate => "Average HR",
            CanonicalMetric::MinHeartRate => "Min HR",
            CanonicalMetric::MaxHeartRate => "Max HR",
            CanonicalMetric::HeartRateVariability => "HRV",
            CanonicalMetric::TimeInBed => "Time in Bed",
            CanonicalMetric::TimeAsleep => "Sleep Duration",
            CanonicalMetric::VO2Max => "VO2 Max",
        }
    }

    /// Whether the daily value is reported as a whole number
    pub fn rounds_to_integer(&self) -> bool {
        matches!(
            self,
            CanonicalMetric::ActiveCalories
                | CanonicalMetric::ExerciseMinutes
                | CanonicalMetric::Steps
                | CanonicalMetric::FlightsClimbed
        )
    }

    /// Stable identifier, matching the serialized form
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalMetric::ActiveCalories => "activeCalories",
            CanonicalMetric::ExerciseMinutes => "exerciseMinutes",
            CanonicalMetric::StandHours => "standHours",
            CanonicalMetric::Steps => "steps",
            CanonicalMetric::Distance => "distance",
            CanonicalMetric::FlightsClimbed => "flightsClimbed",
            CanonicalMetric::RestingHeartRate => "restingHeartRate",
            CanonicalMetric::AverageHeartRate => "averageHeartRate",
            CanonicalMetric::MinHeartRate => "minHeartRate",
            CanonicalMetric::MaxHeartRate => "maxHeartRate",
            CanonicalMetric::HeartRateVariability => "heartRateVariability",
            CanonicalMetric::TimeInBed => "timeInBed",
            CanonicalMetric::TimeAsleep => "timeAsleep",
            CanonicalMetric::VO2Max => "vo2Max",
        }
    }

    /// Look up a metric by its key (case-insensitive)
    pub fn from_key(key: &str) -> Option<Self> {
        CanonicalMetric::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for CanonicalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
