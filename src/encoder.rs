//! Dashboard encoding
//!
//! This module wraps computed dashboards in a payload carrying producer
//! metadata and the settings they were computed with.

use crate::config::ProcessorConfig;
use crate::error::ComputeError;
use crate::types::{Dashboard, DashboardPayload, Producer};
use crate::{HEALTHSYNC_VERSION, PRODUCER_NAME};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Encoder for producing dashboard payloads
pub struct DashboardEncoder {
    instance_id: String,
}

impl Default for DashboardEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a dashboard stamped with the current time
    pub fn encode(&self, dashboard: Dashboard, config: &ProcessorConfig) -> DashboardPayload {
        self.encode_at(dashboard, config, Utc::now())
    }

    pub fn encode_at(
        &self,
        dashboard: Dashboard,
        config: &ProcessorConfig,
        computed_at: DateTime<Utc>,
    ) -> DashboardPayload {
        DashboardPayload {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: HEALTHSYNC_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: computed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            timezone: config.timezone.to_string(),
            trend_window: config.trend_window,
            dashboard,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        dashboard: Dashboard,
        config: &ProcessorConfig,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(dashboard, config);
        serde_json::to_string_pretty(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
