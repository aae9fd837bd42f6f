//! Healthsync Flux - Aggregation engine for health metric exports
//!
//! Flux turns stored Health Auto Export payloads into dashboard-ready daily
//! data through a deterministic pipeline: document adaptation → export merge
//! → metric resolution → daily aggregation → normalization → statistics and
//! trend lines → encoding.
//!
//! ## Modules
//!
//! - **Core pipeline**: `merger`, `resolver`, `aggregator`, `builder`, `stats`, `trend`
//! - **Boundary**: `schema` (input documents), `encoder` (output payloads), `ffi`

pub mod aggregator;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod merger;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod stats;
pub mod timezone;
pub mod trend;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use builder::DailyMetricsBuilder;
pub use catalog::{AggregationPolicy, CanonicalMetric};
pub use config::ProcessorConfig;
pub use error::ComputeError;
pub use merger::{ExportMerger, ExportWindow};
pub use pipeline::{exports_to_dashboard, HealthProcessor};
pub use resolver::MetricResolver;
pub use timezone::LocalZone;

// Schema exports
pub use schema::{ExportAdapter, ExportDocument, EXPORT_FORMAT};

/// Version embedded in all dashboard payloads
pub const HEALTHSYNC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for dashboard payloads
pub const PRODUCER_NAME: &str = "healthsync-flux";
