//! Stored export document format
//!
//! Health Auto Export posts `{"data": {"metrics": [...]}}`; the store keeps
//! each post as a document with an ingestion timestamp. Every field here is
//! optional: exports of partial quality are normal, and a bad sample must not
//! reject the whole document.

use crate::error::ComputeError;
use crate::timezone::{parse_timestamp, LocalZone};
use crate::types::RawSample;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the accepted input format
pub const EXPORT_FORMAT: &str = "health_auto_export";

/// One `{date, qty}` entry of a metric
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<Value>,
    /// Heart-rate style entries carry `Min`/`Avg`/`Max` instead of `qty`
    #[serde(
        default,
        rename = "Avg",
        alias = "avg",
        skip_serializing_if = "Option::is_none"
    )]
    pub avg: Option<Value>,
}

impl SampleEntry {
    pub fn new(date: impl Into<String>, qty: f64) -> Self {
        Self {
            date: Some(date.into()),
            qty: Some(Value::from(qty)),
            avg: None,
        }
    }

    /// Numeric value of the entry: `qty`, else `Avg`
    pub fn value(&self) -> Option<f64> {
        self.qty
            .as_ref()
            .and_then(number)
            .or_else(|| self.avg.as_ref().and_then(number))
    }

    /// Convert to a sample, or say why the entry is unusable
    pub fn to_sample(&self, zone: &LocalZone) -> Result<RawSample, SampleIssue> {
        let date = self.date.as_deref().ok_or(SampleIssue::MissingDate)?;
        let timestamp = parse_timestamp(date, zone)
            .map_err(|_| SampleIssue::InvalidDate(date.to_string()))?;
        let value = self.value().ok_or(SampleIssue::MissingValue)?;
        if !value.is_finite() {
            return Err(SampleIssue::NonFiniteValue);
        }
        Ok(RawSample::new(timestamp, value))
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// One named metric in an export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "unit")]
    pub units: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<SampleEntry>>,
}

impl MetricEntry {
    pub fn entries(&self) -> &[SampleEntry] {
        self.data.as_deref().unwrap_or(&[])
    }
}

/// Exporter body, as posted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportBody {
    #[serde(default)]
    pub metrics: Option<Vec<MetricEntry>>,
}

/// A stored export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Ingestion time: an ISO-8601 string, `{"$date": ...}`, or epoch millis
    #[serde(default, alias = "ingestedAt", alias = "ingested_at")]
    pub timestamp: Option<Value>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    /// Metrics stored flat on the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricEntry>>,
    /// Metrics as posted by the exporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExportBody>,
}

impl ExportDocument {
    /// Metrics, wherever the document keeps them
    pub fn metric_entries(&self) -> &[MetricEntry] {
        self.metrics
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.metrics.as_deref()))
            .unwrap_or(&[])
    }

    /// Ingestion instant, falling back to `createdAt`
    pub fn ingested_at(&self, zone: &LocalZone) -> Result<DateTime<Utc>, ComputeError> {
        let raw = self
            .timestamp
            .as_ref()
            .or(self.created_at.as_ref())
            .ok_or_else(|| ComputeError::MissingField("timestamp".to_string()))?;
        instant(raw, zone)
    }
}

fn instant(value: &Value, zone: &LocalZone) -> Result<DateTime<Utc>, ComputeError> {
    match value {
        Value::String(s) => Ok(parse_timestamp(s, zone)?.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| ComputeError::DateParseError(n.to_string())),
        Value::Object(map) => match map.get("$date") {
            Some(inner) => instant(inner, zone),
            None => Err(ComputeError::DateParseError(value.to_string())),
        },
        other => Err(ComputeError::DateParseError(other.to_string())),
    }
}

/// Accepted shapes of a batch of documents
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExportCollection {
    /// A bare array of documents
    List(Vec<ExportDocument>),
    /// The data API envelope: `{"success": true, "data": [...]}`
    Envelope { data: Vec<ExportDocument> },
    /// One document
    Single(ExportDocument),
}

impl ExportCollection {
    pub fn into_documents(self) -> Vec<ExportDocument> {
        match self {
            ExportCollection::List(docs) => docs,
            ExportCollection::Envelope { data } => data,
            ExportCollection::Single(doc) => vec![doc],
        }
    }
}

/// Why a sample entry was skipped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleIssue {
    #[error("sample has no date")]
    MissingDate,

    #[error("unparseable sample date: {0}")]
    InvalidDate(String),

    #[error("sample has no numeric value")]
    MissingValue,

    #[error("sample value is not finite")]
    NonFiniteValue,
}

/// Problems found when validating a document
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Document has no usable timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Metric #{0} has no name")]
    UnnamedMetric(usize),

    #[error("Metric {metric}, entry #{position}: {issue}")]
    Sample {
        metric: String,
        position: usize,
        issue: SampleIssue,
    },
}
