//! Ephemeral secret cache (spec §3 "Ephemeral caches").
//!
//! `deployment_id → {provider_api_key, hf_token, s3 creds, expires_at}`.
//! Consumed by the background workflow and deleted on completion.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-deployment secret bundle held only for the lifetime of the
/// background provisioning workflow.
#[derive(Debug, Clone, Default)]
pub struct DeploymentSecrets {
    pub provider_api_key: String,
    pub hf_token: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_model_url: Option<String>,
    pub s3_endpoint_url: Option<String>,
}

struct Entry {
    secrets: DeploymentSecrets,
    expires_at: Instant,
}

/// Process-local TTL cache of per-deployment secrets.
pub struct SecretCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl SecretCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, deployment_id: &str, secrets: DeploymentSecrets) {
        self.entries.insert(
            deployment_id.to_string(),
            Entry {
                secrets,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Fetch secrets if present and not expired.
    pub fn get(&self, deployment_id: &str) -> Option<DeploymentSecrets> {
        let entry = self.entries.get(deployment_id)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(deployment_id);
            return None;
        }
        Some(entry.secrets.clone())
    }

    /// Remove the entry for `deployment_id` (called when the background
    /// workflow completes, spec §3).
    pub fn remove(&self, deployment_id: &str) {
        self.entries.remove(deployment_id);
    }

    /// Evict all expired entries. Call periodically from a background task.
    pub fn gc(&self) {
        let now = Instant::now();
        self.entries.retain(|_, e| now < e.expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = SecretCache::new(Duration::from_millis(1));
        cache.insert("dep_1", DeploymentSecrets::default());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("dep_1").is_none());
    }

    #[test]
    fn remove_deletes_entry_immediately() {
        let cache = SecretCache::new(Duration::from_secs(60));
        cache.insert("dep_1", DeploymentSecrets::default());
        cache.remove("dep_1");
        assert!(cache.get("dep_1").is_none());
    }
}
