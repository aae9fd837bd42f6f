//! Feature derivation
//!
//! This module derives secondary values from normalized daily records:
//! - Speed from distance and exercise time
//! - Activity ring completion against daily goals
//! - The default day to display

use crate::types::{DailyRecord, RingProgress};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily activity ring goals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingGoals {
    /// Move ring, active kcal
    pub move_kcal: f64,
    /// Exercise ring, minutes
    pub exercise_minutes: f64,
    /// Stand ring, hours
    pub stand_hours: f64,
}

impl Default for RingGoals {
    fn default() -> Self {
        Self {
            move_kcal: 600.0,
            exercise_minutes: 30.0,
            stand_hours: 12.0,
        }
    }
}

/// Feature deriver for computing derived values
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Fill in derived fields of a record in place
    pub fn derive(record: &mut DailyRecord) {
        record.speed = compute_speed(record);
    }

    /// Ring completion for one day
    pub fn ring_progress(record: &DailyRecord, goals: &RingGoals) -> RingProgress {
        RingProgress {
            date: record.date,
            move_ring: ring_fraction(record.active_calories, goals.move_kcal),
            exercise: ring_fraction(record.exercise_minutes, goals.exercise_minutes),
            stand: ring_fraction(record.stand_hours, goals.stand_hours),
        }
    }

    /// Index of `today` in `records`, falling back to the most recent day
    pub fn select_day(records: &[DailyRecord], today: NaiveDate) -> Option<usize> {
        if records.is_empty() {
            return None;
        }
        records
            .iter()
            .position(|r| r.date == today)
            .or(Some(records.len() - 1))
    }
}

/// Average speed in km/h: distance (m) over exercise time (min)
fn compute_speed(record: &DailyRecord) -> Option<f64> {
    match (record.distance, record.exercise_minutes) {
        (Some(distance_m), Some(minutes)) if minutes > 0.0 => {
            Some((distance_m / 1000.0) / (minutes / 60.0))
        }
        _ => None,
    }
}

fn ring_fraction(value: Option<f64>, goal: f64) -> Option<f64> {
    match value {
        Some(v) if goal > 0.0 => Some((v / goal).clamp(0.0, 1.0)),
        _ => None,
    }
}
