//! Provider Adapter (spec §4.3) — abstract interface over GPU-serverless
//! backends.

pub mod runpod;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::OrchestratorError;

/// Options forwarded to [`ProviderAdapter::create_endpoint`]. Fields beyond
/// the common ones are Runpod-specific (spec §4.3) but kept on the shared
/// struct since no second provider ships yet.
#[derive(Debug, Clone, Default)]
pub struct CreateEndpointOptions {
    pub template_id: Option<String>,
    pub workers_min: Option<u32>,
    pub workers_max: Option<u32>,
    pub idle_timeout_secs: Option<u32>,
    pub scaler_type: Option<String>,
    pub scaler_value: Option<u32>,
    pub volume_gb: Option<u32>,
    pub locations: Option<Vec<String>>,
}

/// Result of a successful endpoint creation.
#[derive(Debug, Clone)]
pub struct CreatedEndpoint {
    pub id: String,
    pub url: String,
}

/// One endpoint as returned by [`ProviderAdapter::list_endpoints`].
#[derive(Debug, Clone)]
pub struct EndpointSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub url: String,
}

/// Statuses that disqualify an endpoint from warm-reuse discovery
/// (spec §4.5 "Warm-reuse short-circuit").
pub fn is_dead_status(status: &str) -> bool {
    matches!(
        status.to_uppercase().as_str(),
        "TERMINATED" | "DELETED" | "FAILED" | "STOPPED"
    )
}

/// Case-insensitive substrings that identify a capacity error (spec §4.3).
const CAPACITY_SUBSTRINGS: &[&str] = &[
    "insufficient",
    "no gpu",
    "no capacity",
    "out of capacity",
    "unavailable",
    "stock",
    "resource exhausted",
];

/// Does `message` look like a recoverable capacity error?
pub fn is_capacity_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    CAPACITY_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Abstract contract over a GPU-serverless backend (spec §4.3).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Create a new serverless endpoint. `env` is injected into the worker
    /// container (spec §4.5 "Worker environment").
    async fn create_endpoint(
        &self,
        name: &str,
        gpu_id: &str,
        image: &str,
        env: &HashMap<String, String>,
        api_key: &str,
        opts: &CreateEndpointOptions,
    ) -> Result<CreatedEndpoint, OrchestratorError>;

    /// Best-effort, idempotent delete.
    async fn delete_endpoint(&self, id: &str, api_key: &str) -> Result<(), OrchestratorError>;

    /// List endpoints visible to `api_key`, for warm-reuse discovery.
    async fn list_endpoints(
        &self,
        api_key: &str,
    ) -> Result<Vec<EndpointSummary>, OrchestratorError>;

    /// Pure derivation of the invocation URL from an endpoint id.
    fn run_url(&self, id: &str) -> String;
}
