//! Adapter for converting stored export documents into `Export` values
//!
//! Documents are parsed leniently; conversion drops sample entries that lack a
//! usable date or value and counts what it dropped.

use crate::error::ComputeError;
use crate::schema::export_document::*;
use crate::timezone::LocalZone;
use crate::types::{Export, RawMetric};
use serde::Serialize;
use tracing::{debug, warn};

/// Adapter for converting stored documents into exports
pub struct ExportAdapter;

impl ExportAdapter {
    /// Parse a JSON array of documents, an API envelope, or a single document
    pub fn parse_json(json: &str) -> Result<Vec<ExportDocument>, ComputeError> {
        let collection: ExportCollection = serde_json::from_str(json)?;
        Ok(collection.into_documents())
    }

    /// Parse NDJSON (one document per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ExportDocument>, ComputeError> {
        let mut documents = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ExportDocument>(trimmed) {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(documents)
    }

    /// Convert documents to exports, preserving their order.
    ///
    /// A document without a usable timestamp fails the whole batch; bad
    /// sample entries are skipped and counted.
    pub fn to_exports(
        documents: &[ExportDocument],
        zone: &LocalZone,
    ) -> Result<(Vec<Export>, ConversionReport), ComputeError> {
        let mut report = ConversionReport::default();
        let mut exports = Vec::with_capacity(documents.len());

        for doc in documents {
            let export = Self::convert(doc, zone, &mut report)?;
            exports.push(export);
        }

        if report.samples_skipped > 0 {
            warn!(
                skipped = report.samples_skipped,
                kept = report.samples_kept,
                "skipped malformed sample entries"
            );
        }
        Ok((exports, report))
    }

    /// Convert one document
    pub fn to_export(doc: &ExportDocument, zone: &LocalZone) -> Result<Export, ComputeError> {
        Self::convert(doc, zone, &mut ConversionReport::default())
    }

    fn convert(
        doc: &ExportDocument,
        zone: &LocalZone,
        report: &mut ConversionReport,
    ) -> Result<Export, ComputeError> {
        let ingested_at = doc.ingested_at(zone)?;
        let mut metrics: Vec<RawMetric> = Vec::new();

        for entry in doc.metric_entries() {
            let name = match entry.name.as_deref() {
                Some(name) if !name.is_empty() => name,
                _ => {
                    report.samples_skipped += entry.entries().len();
                    continue;
                }
            };

            let mut samples = Vec::with_capacity(entry.entries().len());
            for sample in entry.entries() {
                match sample.to_sample(zone) {
                    Ok(s) => samples.push(s),
                    Err(issue) => {
                        debug!(metric = name, %issue, "skipping sample entry");
                        report.samples_skipped += 1;
                    }
                }
            }
            report.samples_kept += samples.len();

            let unit = entry.units.clone().unwrap_or_default();
            // names are unique within one export; a repeat extends the first
            match metrics.iter_mut().find(|m| m.name == name) {
                Some(existing) => existing.samples.extend(samples),
                None => metrics.push(RawMetric::new(name, unit, samples)),
            }
        }

        report.documents += 1;
        report.metrics += metrics.len();
        Ok(Export {
            ingested_at,
            metrics,
        })
    }

    /// Validate a batch of documents, returning only those with problems
    pub fn validate_documents(documents: &[ExportDocument], zone: &LocalZone) -> Vec<ValidationResult> {
        documents
            .iter()
            .enumerate()
            .map(|(index, doc)| ValidationResult {
                index,
                errors: validate_document(doc, zone),
            })
            .filter(|r| !r.errors.is_empty())
            .collect()
    }
}

fn validate_document(doc: &ExportDocument, zone: &LocalZone) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = doc.ingested_at(zone) {
        errors.push(ValidationError::InvalidTimestamp(e.to_string()));
    }

    for (metric_index, entry) in doc.metric_entries().iter().enumerate() {
        let name = match entry.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                errors.push(ValidationError::UnnamedMetric(metric_index));
                continue;
            }
        };
        for (position, sample) in entry.entries().iter().enumerate() {
            if let Err(issue) = sample.to_sample(zone) {
                errors.push(ValidationError::Sample {
                    metric: name.to_string(),
                    position,
                    issue,
                });
            }
        }
    }

    errors
}

/// Counts from a document conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub documents: usize,
    pub metrics: usize,
    pub samples_kept: usize,
    pub samples_skipped: usize,
}

/// Result of document validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub errors: Vec<ValidationError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_json() -> &'static str {
        r#"[
            {
                "timestamp": "2024-01-16T06:00:00Z",
                "metrics": [
                    {"name": "step_count", "units": "count", "data": [
                        {"date": "2024-01-15 08:00:00 +0000", "qty": 120},
                        {"date": "2024-01-15 09:00:00 +0000", "qty": null},
                        {"qty": 7}
                    ]},
                    {"name": "", "units": "count", "data": [
                        {"date": "2024-01-15 08:00:00 +0000", "qty": 1}
                    ]}
                ]
            },
            {
                "timestamp": "2024-01-17T06:00:00Z",
                "data": {"metrics": [
                    {"name": "active_energy", "units": "kcal", "data": [
                        {"date": "2024-01-16 08:00:00 +0000", "qty": 12.5}
                    ]}
                ]}
            }
        ]"#
    }

    #[test]
    fn test_parse_and_convert() {
        let docs = ExportAdapter::parse_json(sample_json()).unwrap();
        assert_eq!(docs.len(), 2);

        let (exports, report) = ExportAdapter::to_exports(&docs, &LocalZone::utc()).unwrap();
        assert_eq!(exports.len(), 2);
        assert_eq!(exports[0].metrics.len(), 1);
        assert_eq!(exports[0].metrics[0].samples.len(), 1);
        assert_eq!(exports[1].metrics[0].name, "active_energy");

        assert_eq!(
            report,
            ConversionReport {
                documents: 2,
                metrics: 2,
                samples_kept: 2,
                samples_skipped: 3,
            }
        );
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = "{\"timestamp\": \"2024-01-16\"}\n\n{\"timestamp\": \"2024-01-17\"}\n";
        let docs = ExportAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(docs.len(), 2);

        let err = ExportAdapter::parse_ndjson("{\"timestamp\": \"2024-01-16\"}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_timestamp_fails_batch() {
        let docs = ExportAdapter::parse_json(r#"[{"metrics": []}]"#).unwrap();
        assert!(ExportAdapter::to_exports(&docs, &LocalZone::utc()).is_err());
    }

    #[test]
    fn test_duplicate_names_within_export_are_combined() {
        let docs = ExportAdapter::parse_json(
            r#"{"timestamp": "2024-01-16", "metrics": [
                {"name": "steps", "units": "count", "data": [{"date": "2024-01-15", "qty": 1}]},
                {"name": "steps", "units": "count", "data": [{"date": "2024-01-14", "qty": 2}]}
            ]}"#,
        )
        .unwrap();
        let export = ExportAdapter::to_export(&docs[0], &LocalZone::utc()).unwrap();
        assert_eq!(export.metrics.len(), 1);
        assert_eq!(export.metrics[0].samples.len(), 2);
    }

    #[test]
    fn test_naive_dates_use_zone() {
        let docs = ExportAdapter::parse_json(
            r#"{"timestamp": "2024-01-16T00:00:00Z", "metrics": [
                {"name": "steps", "units": "count", "data": [{"date": "2024-01-15 23:30:00", "qty": 1}]}
            ]}"#,
        )
        .unwrap();
        let zone = LocalZone::parse("-05:00").unwrap();
        let export = ExportAdapter::to_export(&docs[0], &zone).unwrap();
        let ts = export.metrics[0].samples[0].timestamp;
        assert_eq!(zone.date_of(&ts), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_validate_documents() {
        let docs = ExportAdapter::parse_json(sample_json()).unwrap();
        let results = ExportAdapter::validate_documents(&docs, &LocalZone::utc());

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 0);
        // null qty, missing date, unnamed metric
        assert_eq!(results[0].errors.len(), 3);
    }
}
