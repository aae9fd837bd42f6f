//! Stored export document schema
//!
//! This module defines the lenient input model for exporter payloads as the
//! store keeps them, and the adapter that turns them into `Export` values.

mod export_document;
mod adapter;

pub use export_document::*;
pub use adapter::*;
