//! Value normalization
//!
//! This module brings aggregated daily values into the catalog's output units:
//! - Distance converted to meters from the exporter's unit string
//! - Count-like metrics rounded to whole numbers

use crate::catalog::CanonicalMetric;

/// Meters in one statute mile
pub const METERS_PER_MILE: f64 = 1609.34;

/// Meters in one kilometer
pub const METERS_PER_KILOMETER: f64 = 1000.0;

/// Distance unit as reported by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    /// Interpret an exporter unit string. Unknown units are taken as meters.
    pub fn from_unit_str(unit: &str) -> Self {
        match unit.trim().to_lowercase().as_str() {
            "mi" | "mi." | "mile" | "miles" => DistanceUnit::Miles,
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                DistanceUnit::Kilometers
            }
            _ => DistanceUnit::Meters,
        }
    }

    pub fn meters_factor(&self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => METERS_PER_KILOMETER,
            DistanceUnit::Miles => METERS_PER_MILE,
        }
    }
}

/// Normalizer for aggregated daily values
pub struct Normalizer;

impl Normalizer {
    /// Normalize one aggregated value of `metric` whose raw samples were in
    /// `source_unit`.
    pub fn normalize(metric: CanonicalMetric, value: f64, source_unit: &str) -> f64 {
        let converted = match metric {
            CanonicalMetric::Distance => {
                value * DistanceUnit::from_unit_str(source_unit).meters_factor()
            }
            _ => value,
        };

        if metric.rounds_to_integer() {
            converted.round()
        } else {
            converted
        }
    }
}
