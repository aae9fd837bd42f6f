//! Pipeline orchestration
//!
//! This module provides the public API for Healthsync Flux.
//! It orchestrates the full pipeline from stored export documents to the
//! dashboard output.

use crate::aggregator::DailyAggregator;
use crate::builder::DailyMetricsBuilder;
use crate::config::ProcessorConfig;
use crate::encoder::DashboardEncoder;
use crate::error::ComputeError;
use crate::features::FeatureDeriver;
use crate::merger::ExportWindow;
use crate::schema::{ConversionReport, ExportAdapter, ExportDocument};
use crate::stats::historical_stats;
use crate::trend::time_series;
use crate::types::{Dashboard, Export};
use chrono::{DateTime, Utc};
use tracing::info;

/// Convert stored export JSON into an encoded dashboard payload.
///
/// # Arguments
/// * `raw_json` - JSON array of export documents, an API envelope, or one document
/// * `config` - Processing settings
///
/// # Returns
/// Pretty-printed dashboard payload JSON
///
/// # Example
/// ```ignore
/// let payload = exports_to_dashboard(&stored_json, &ProcessorConfig::default())?;
/// ```
pub fn exports_to_dashboard(raw_json: &str, config: &ProcessorConfig) -> Result<String, ComputeError> {
    let processor = HealthProcessor::new(config.clone())?;
    let dashboard = processor.process_json(raw_json, Utc::now())?;
    processor.encoder.encode_to_json(dashboard, config)
}

/// Processor holding the settings for repeated recomputation.
///
/// Every call recomputes from the snapshot it is given; nothing is carried
/// between calls.
pub struct HealthProcessor {
    config: ProcessorConfig,
    builder: DailyMetricsBuilder,
    encoder: DashboardEncoder,
}

impl Default for HealthProcessor {
    fn default() -> Self {
        Self::from_valid_config(ProcessorConfig::default())
    }
}

impl HealthProcessor {
    /// Create a processor, rejecting invalid settings
    pub fn new(config: ProcessorConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ProcessorConfig) -> Self {
        let aggregator = DailyAggregator::new(config.timezone)
            .with_stand_hours_zero(config.stand_hours_zero);
        Self {
            builder: DailyMetricsBuilder::new(aggregator),
            encoder: DashboardEncoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn encoder(&self) -> &DashboardEncoder {
        &self.encoder
    }

    /// Compute the dashboard for `exports`, in the order given.
    ///
    /// `now` anchors the export window and the choice of the selected day.
    pub fn process(&self, exports: Vec<Export>, now: DateTime<Utc>) -> Dashboard {
        let exports = match self.config.window_days {
            Some(days) => ExportWindow::last_days(days).retain(exports, now),
            None => exports,
        };

        let days = self.builder.build(&exports);
        let statistics = historical_stats(&days);
        let series = time_series(&days, self.config.trend_window, &self.config.tracked);
        let rings = days
            .iter()
            .map(|day| FeatureDeriver::ring_progress(day, &self.config.ring_goals))
            .collect();
        let today = self.config.timezone.today(now);
        let selected_index = FeatureDeriver::select_day(&days, today);

        info!(
            exports = exports.len(),
            days = days.len(),
            metrics_with_stats = statistics.len(),
            "computed dashboard"
        );

        Dashboard {
            days,
            statistics,
            time_series: series,
            rings,
            selected_index,
        }
    }

    /// Convert documents and compute the dashboard.
    ///
    /// Fails without output when any document lacks a usable timestamp.
    pub fn process_documents(
        &self,
        documents: &[ExportDocument],
        now: DateTime<Utc>,
    ) -> Result<(Dashboard, ConversionReport), ComputeError> {
        let (exports, report) = ExportAdapter::to_exports(documents, &self.config.timezone)?;
        Ok((self.process(exports, now), report))
    }

    /// Parse stored export JSON and compute the dashboard
    pub fn process_json(&self, raw_json: &str, now: DateTime<Utc>) -> Result<Dashboard, ComputeError> {
        let documents = ExportAdapter::parse_json(raw_json)?;
        let (dashboard, _) = self.process_documents(&documents, now)?;
        Ok(dashboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CanonicalMetric;
    use crate::timezone::LocalZone;
    use chrono::{NaiveDate, TimeZone};

    fn sample_exports_json() -> &'static str {
        r#"[
            {
                "timestamp": "2024-01-15T12:00:00Z",
                "metrics": [
                    {"name": "step_count", "units": "count", "data": [
                        {"date": "2024-01-14 10:00:00 +0000", "qty": 4000},
                        {"date": "2024-01-15 10:00:00 +0000", "qty": 3000}
                    ]},
                    {"name": "active_energy", "units": "kcal", "data": [
                        {"date": "2024-01-15 10:00:00 +0000", "qty": 300.2}
                    ]}
                ]
            },
            {
                "timestamp": "2024-01-16T23:00:00Z",
                "metrics": [
                    {"name": "step_count", "units": "count", "data": [
                        {"date": "2024-01-15 10:00:00 +0000", "qty": 3000},
                        {"date": "2024-01-15 18:00:00 +0000", "qty": 2000},
                        {"date": "2024-01-16 09:00:00 +0000", "qty": 6000}
                    ]}
                ]
            }
        ]"#
    }

    fn utc_processor() -> HealthProcessor {
        HealthProcessor::new(ProcessorConfig {
            timezone: LocalZone::utc(),
            ..ProcessorConfig::default()
        })
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_process_json() {
        let dashboard = utc_processor()
            .process_json(sample_exports_json(), now())
            .unwrap();

        let steps: Vec<Option<f64>> = dashboard.days.iter().map(|d| d.steps).collect();
        assert_eq!(steps, vec![Some(4000.0), Some(5000.0), Some(6000.0)]);
        assert_eq!(dashboard.days[1].active_calories, Some(300.0));

        // 2024-01-16 is today in UTC
        assert_eq!(dashboard.selected_index, Some(2));
        assert_eq!(dashboard.rings.len(), 3);
        assert_eq!(dashboard.rings[1].move_ring, Some(0.5));
        assert_eq!(dashboard.time_series.len(), 3);

        let step_stat = dashboard
            .statistics
            .iter()
            .find(|s| s.metric == CanonicalMetric::Steps)
            .unwrap();
        assert_eq!(step_stat.min, 4000.0);
        assert_eq!(step_stat.max, 6000.0);
        assert_eq!(step_stat.mean, 5000.0);
    }

    #[test]
    fn test_empty_input() {
        let dashboard = utc_processor().process(Vec::new(), now());
        assert!(dashboard.days.is_empty());
        assert!(dashboard.statistics.is_empty());
        assert!(dashboard.time_series.is_empty());
        assert!(dashboard.rings.is_empty());
        assert_eq!(dashboard.selected_index, None);

        let from_json = utc_processor().process_json("[]", now()).unwrap();
        assert!(from_json.days.is_empty());
    }

    #[test]
    fn test_window_drops_old_exports() {
        let processor = HealthProcessor::new(ProcessorConfig {
            timezone: LocalZone::utc(),
            window_days: Some(1),
            ..ProcessorConfig::default()
        })
        .unwrap();

        let dashboard = processor
            .process_json(sample_exports_json(), now())
            .unwrap();
        // only the second export is inside the last day
        assert_eq!(dashboard.days.len(), 2);
        assert_eq!(dashboard.days[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(dashboard.days[0].steps, Some(5000.0));
        assert_eq!(dashboard.days[0].active_calories, None);
    }

    #[test]
    fn test_default_keeps_exports_older_than_a_year() {
        let two_years_on = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
        let dashboard = utc_processor()
            .process_json(sample_exports_json(), two_years_on)
            .unwrap();
        assert_eq!(dashboard.days.len(), 3);
        assert_eq!(dashboard.days[0].steps, Some(4000.0));
    }

    #[test]
    fn test_selected_day_falls_back_to_latest() {
        let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let dashboard = utc_processor()
            .process_json(sample_exports_json(), later)
            .unwrap();
        assert_eq!(dashboard.selected_index, Some(2));
    }

    #[test]
    fn test_invalid_json() {
        assert!(utc_processor().process_json("not valid json", now()).is_err());
    }

    #[test]
    fn test_missing_timestamp_aborts_batch() {
        let json = r#"[{"timestamp": "2024-01-15T00:00:00Z"}, {"metrics": []}]"#;
        assert!(utc_processor().process_json(json, now()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ProcessorConfig {
            trend_window: 0,
            ..ProcessorConfig::default()
        };
        assert!(HealthProcessor::new(config).is_err());
    }

    #[test]
    fn test_exports_to_dashboard() {
        let config = ProcessorConfig {
            timezone: LocalZone::utc(),
            ..ProcessorConfig::default()
        };
        let json = exports_to_dashboard(sample_exports_json(), &config).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["producer"]["name"], "healthsync-flux");
        assert_eq!(payload["days"].as_array().unwrap().len(), 3);
        assert_eq!(payload["days"][2]["steps"], 6000.0);
    }
}
