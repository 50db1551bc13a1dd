//! Wire-facing result types and client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store session handle issued by the workflow engine connect call.
pub type SessionId = i64;

/// Immutable version tuple returned by checkout. The orchestrator never
/// guesses these values; they flow from the checkout result into checkin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub document_id: String,
    pub version: String,
    pub volume_id: String,
    pub site_id: String,
}

/// Raw checkout result: status plus the storage coordinates on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub status: i32,
    pub volume_id: String,
    pub site_id: String,
    pub version: String,
}

/// Raw checkin result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinOutcome {
    pub status: i32,
    pub new_version: String,
}

/// Raw add-annotation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddAnnotationOutcome {
    pub status: i32,
}

/// Connection settings for the document store endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocStoreConfig {
    /// Base URL of the execute-API endpoint.
    pub api_url: String,
    /// Multipart checkin endpoint; derived from `api_url` when not set.
    pub checkin_url: Option<String>,
    /// Document-stream download endpoint.
    pub document_url: String,
    /// Cabinet (tenant) name sent with every call.
    pub cabinet: String,
    /// Fallbacks when checkout reports empty storage coordinates.
    pub default_volume_id: String,
    pub default_site_id: String,
    /// Bounded network timeouts.
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for DocStoreConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8601/docstore/executeApi".to_string(),
            checkin_url: None,
            document_url: "http://localhost:8601/docstore/getDocumentStream".to_string(),
            cabinet: "mainline".to_string(),
            default_volume_id: "1".to_string(),
            default_site_id: "1".to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
        }
    }
}

impl DocStoreConfig {
    /// Checkin endpoint: configured explicitly or derived from the API URL.
    pub fn checkin_endpoint(&self) -> String {
        self.checkin_url
            .clone()
            .unwrap_or_else(|| self.api_url.replace("/executeApi", "/checkInDocument"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkin_endpoint_derived_from_api_url() {
        let config = DocStoreConfig::default();
        assert_eq!(
            config.checkin_endpoint(),
            "http://localhost:8601/docstore/checkInDocument"
        );
    }

    #[test]
    fn test_explicit_checkin_endpoint_wins() {
        let config = DocStoreConfig {
            checkin_url: Some("http://elsewhere/checkin".to_string()),
            ..DocStoreConfig::default()
        };
        assert_eq!(config.checkin_endpoint(), "http://elsewhere/checkin");
    }
}
