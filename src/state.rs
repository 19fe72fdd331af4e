//! Shared application state injected into every axum handler (spec §9
//! "Global mutable state").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::provider::runpod::RunpodAdapter;
use crate::provider::ProviderAdapter;
use crate::rate_limit::RateLimiter;
use crate::store::logs::LiveLogRing;
use crate::store::memory::InMemoryDeploymentStore;
use crate::store::secrets::SecretCache;
use crate::store::DeploymentStore;

/// Everything a request handler or background workflow needs. Cloning is
/// cheap — every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DeploymentStore>,
    pub secrets: Arc<SecretCache>,
    pub logs: Arc<LiveLogRing>,
    pub rate_limit_user: Arc<RateLimiter>,
    pub rate_limit_ip: Arc<RateLimiter>,
    /// Provider name → adapter. Populated at startup; no runtime
    /// reflection (spec §9 "Dynamic dispatch").
    pub providers: Arc<HashMap<String, Arc<dyn ProviderAdapter>>>,
    pub http_client: Client,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let mut providers: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        providers.insert(
            "runpod".to_string(),
            Arc::new(RunpodAdapter::new(
                config.runpod_graphql_url.clone(),
                config.provider_timeout_secs,
            )),
        );

        let http_client = Client::builder()
            .timeout(Duration::from_secs(
                config.hf_timeout_secs.max(config.webhook_timeout_secs),
            ))
            .build()
            .expect("failed to build reqwest client");

        Self {
            store: Arc::new(InMemoryDeploymentStore::new()),
            secrets: Arc::new(SecretCache::new(Duration::from_secs(config.secret_ttl_secs))),
            logs: Arc::new(LiveLogRing::new(
                config.log_ring_capacity,
                Duration::from_secs(config.secret_ttl_secs.max(3600)),
            )),
            rate_limit_user: Arc::new(RateLimiter::new(
                config.rate_limit_per_min,
                Duration::from_secs(60),
            )),
            rate_limit_ip: Arc::new(RateLimiter::new(
                config.rate_limit_per_min * config.rate_limit_ip_multiplier,
                Duration::from_secs(60),
            )),
            providers: Arc::new(providers),
            http_client,
            metrics: Arc::new(Metrics::new()),
            config,
        }
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(name).cloned()
    }
}
