//! Single-node, process-local [`DeploymentStore`] implementation backed by
//! a [`DashMap`]. Suitable for a single-replica deployment (spec §5
//! "Per-deployment serialization").

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::OrchestratorError;
use crate::models::{Deployment, LogLevel, LogLine};
use crate::redact::redact;

use super::{DeploymentPatch, DeploymentStore};

/// Max log lines retained per deployment, regardless of configured TTL
/// (store policy referenced by spec §3).
const MAX_LOGS_PER_DEPLOYMENT: usize = 1000;

pub struct InMemoryDeploymentStore {
    deployments: DashMap<String, Deployment>,
}

impl InMemoryDeploymentStore {
    pub fn new() -> Self {
        Self {
            deployments: DashMap::new(),
        }
    }
}

impl Default for InMemoryDeploymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentStore for InMemoryDeploymentStore {
    async fn get(&self, id: &str) -> Option<Deployment> {
        self.deployments.get(id).map(|r| r.clone())
    }

    async fn set(&self, deployment: Deployment) {
        self.deployments
            .insert(deployment.deployment_id.clone(), deployment);
    }

    async fn update(&self, id: &str, patch: DeploymentPatch) -> Option<Deployment> {
        let mut entry = self.deployments.get_mut(id)?;
        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(v) = patch.runpod_endpoint_id {
            entry.runpod_endpoint_id = Some(v);
        }
        if let Some(v) = patch.endpoint_url {
            entry.endpoint_url = Some(v);
        }
        if let Some(v) = patch.gpu_allocated {
            entry.gpu_allocated = Some(v);
        }
        if let Some(v) = patch.model_vram_gb {
            entry.model_vram_gb = Some(v);
        }
        if let Some(v) = patch.error {
            entry.error = Some(v);
        }
        if let Some(v) = patch.ready_at {
            if entry.ready_at.is_none() {
                entry.ready_at = Some(v);
            }
        }
        Some(entry.clone())
    }

    async fn append_log(
        &self,
        id: &str,
        level: LogLevel,
        message: String,
    ) -> Result<(), OrchestratorError> {
        let mut entry = self
            .deployments
            .get_mut(id)
            .ok_or(OrchestratorError::DeploymentNotFound)?;
        entry.logs.push(LogLine {
            timestamp: chrono::Utc::now(),
            level,
            message: redact(&message),
        });
        if entry.logs.len() > MAX_LOGS_PER_DEPLOYMENT {
            let overflow = entry.logs.len() - MAX_LOGS_PER_DEPLOYMENT;
            entry.logs.drain(0..overflow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeploymentStatus;

    fn sample(id: &str) -> Deployment {
        Deployment {
            deployment_id: id.to_string(),
            status: DeploymentStatus::Validating,
            hf_model_id: "black-forest-labs/FLUX.1-schnell".to_string(),
            user_webhook_url: "https://httpbin.org/post".to_string(),
            gpu_tier: None,
            region: None,
            runpod_endpoint_id: None,
            endpoint_url: None,
            gpu_allocated: None,
            model_vram_gb: None,
            logs: Vec::new(),
            error: None,
            created_at: chrono::Utc::now(),
            ready_at: None,
            user_hash: "hash".to_string(),
            provider: "runpod".to_string(),
            endpoint_name: "visgate-hash-flux".to_string(),
            pool_policy: "on-demand".to_string(),
        }
    }

    #[tokio::test]
    async fn ready_at_is_set_at_most_once() {
        let store = InMemoryDeploymentStore::new();
        store.set(sample("dep_2026_aaaaaaaa")).await;

        let t1 = chrono::Utc::now();
        store
            .update(
                "dep_2026_aaaaaaaa",
                DeploymentPatch {
                    status: Some(DeploymentStatus::Ready),
                    ready_at: Some(t1),
                    ..Default::default()
                },
            )
            .await;

        let t2 = t1 + chrono::Duration::seconds(5);
        let updated = store
            .update(
                "dep_2026_aaaaaaaa",
                DeploymentPatch {
                    ready_at: Some(t2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.ready_at, Some(t1));
    }

    #[tokio::test]
    async fn append_log_redacts_secrets() {
        let store = InMemoryDeploymentStore::new();
        store.set(sample("dep_2026_bbbbbbbb")).await;
        store
            .append_log(
                "dep_2026_bbbbbbbb",
                LogLevel::Info,
                "using rpa_SECRETVALUE123 to call provider".to_string(),
            )
            .await
            .unwrap();
        let d = store.get("dep_2026_bbbbbbbb").await.unwrap();
        assert!(!d.logs[0].message.contains("rpa_SECRETVALUE123"));
    }
}
