//! Deployment Store (spec §4.4) — persistent collection of deployment
//! documents, plus the ephemeral in-memory caches described in spec §3.

pub mod logs;
pub mod memory;
pub mod secrets;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::models::{Deployment, LogLevel};

/// Partial update applied atomically to a stored deployment. `None` fields
/// are left untouched.
#[derive(Debug, Clone, Default)]
pub struct DeploymentPatch {
    pub status: Option<crate::models::DeploymentStatus>,
    pub runpod_endpoint_id: Option<String>,
    pub endpoint_url: Option<String>,
    pub gpu_allocated: Option<String>,
    pub model_vram_gb: Option<u32>,
    pub error: Option<String>,
    pub ready_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Persistence seam for deployment documents (spec §4.4).
///
/// The shipped implementation ([`memory::InMemoryDeploymentStore`]) is a
/// single-node, process-local store. The trait exists so a durable
/// document-store-backed implementation can be substituted without
/// touching the orchestration engine.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<Deployment>;

    /// Create or overwrite the record for `deployment.deployment_id`.
    async fn set(&self, deployment: Deployment);

    /// Apply `patch` to the stored record, returning the updated record.
    /// No-op (returns `None`) if the record does not exist.
    async fn update(&self, id: &str, patch: DeploymentPatch) -> Option<Deployment>;

    /// Append one log line. Must be atomic with respect to other updates
    /// (array-union semantics, spec §4.4) and bounded by store policy.
    async fn append_log(
        &self,
        id: &str,
        level: LogLevel,
        message: String,
    ) -> Result<(), OrchestratorError>;
}
