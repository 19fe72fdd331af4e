//! Process configuration, loaded once at startup from environment variables.
//!
//! Mirrors the reference gateway's `main.rs` convention: each setting is
//! read individually with an explicit default, rather than through a
//! generic multi-format config loader.

#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,
    /// Shared secret worker callbacks must present (header or `?secret=`).
    pub internal_secret: String,
    /// Absolute base URL of this service, used to build `VISGATE_WEBHOOK`.
    pub base_url: String,
    /// Per-`user_hash` sliding-window rate limit (requests/minute).
    pub rate_limit_per_min: u32,
    /// Per-client-IP limit, expressed as a multiplier of `rate_limit_per_min`.
    pub rate_limit_ip_multiplier: u32,
    /// Outbound timeout for user webhook delivery.
    pub webhook_timeout_secs: u64,
    /// Outbound timeout for provider (Runpod) calls.
    pub provider_timeout_secs: u64,
    /// Outbound timeout for Hugging Face Hub calls.
    pub hf_timeout_secs: u64,
    /// Total wall-clock budget for the readiness probe monitor.
    pub readiness_timeout_secs: u64,
    /// Interval between readiness probe attempts.
    pub readiness_probe_interval_secs: u64,
    /// TTL applied to entries in the ephemeral secret cache.
    pub secret_ttl_secs: u64,
    /// Max number of lines retained per deployment in the live log ring.
    pub log_ring_capacity: usize,
    /// Runpod GraphQL endpoint.
    pub runpod_graphql_url: String,
    /// Runpod serverless template id used when creating endpoints.
    pub runpod_template_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            internal_secret: "dev-secret".to_string(),
            base_url: "http://localhost:8080".to_string(),
            rate_limit_per_min: 100,
            rate_limit_ip_multiplier: 2,
            webhook_timeout_secs: 10,
            provider_timeout_secs: 30,
            hf_timeout_secs: 10,
            readiness_timeout_secs: 15 * 60,
            readiness_probe_interval_secs: 8,
            secret_ttl_secs: 3600,
            log_ring_capacity: 500,
            runpod_graphql_url: "https://api.runpod.io/graphql".to_string(),
            runpod_template_id: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from `VISGATE_*` / `RUNPOD_*` environment
    /// variables, falling back to [`Config::default`] for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port: u16 = std::env::var("VISGATE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let internal_secret =
            std::env::var("VISGATE_INTERNAL_SECRET").unwrap_or(defaults.internal_secret);

        let base_url = std::env::var("VISGATE_BASE_URL").unwrap_or(defaults.base_url);

        let rate_limit_per_min: u32 = std::env::var("VISGATE_RATE_LIMIT_PER_MIN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_min);

        let rate_limit_ip_multiplier: u32 = std::env::var("VISGATE_RATE_LIMIT_IP_MULTIPLIER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_ip_multiplier);

        let webhook_timeout_secs: u64 = std::env::var("VISGATE_WEBHOOK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.webhook_timeout_secs);

        let provider_timeout_secs: u64 = std::env::var("VISGATE_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.provider_timeout_secs);

        let hf_timeout_secs: u64 = std::env::var("VISGATE_HF_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.hf_timeout_secs);

        let readiness_timeout_secs: u64 = std::env::var("VISGATE_READINESS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.readiness_timeout_secs);

        let readiness_probe_interval_secs: u64 =
            std::env::var("VISGATE_READINESS_PROBE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.readiness_probe_interval_secs);

        let secret_ttl_secs: u64 = std::env::var("VISGATE_SECRET_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.secret_ttl_secs);

        let log_ring_capacity: usize = std::env::var("VISGATE_LOG_RING_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.log_ring_capacity);

        let runpod_graphql_url =
            std::env::var("RUNPOD_GRAPHQL_URL").unwrap_or(defaults.runpod_graphql_url);

        let runpod_template_id =
            std::env::var("RUNPOD_TEMPLATE_ID").unwrap_or(defaults.runpod_template_id);

        Self {
            port,
            internal_secret,
            base_url,
            rate_limit_per_min,
            rate_limit_ip_multiplier,
            webhook_timeout_secs,
            provider_timeout_secs,
            hf_timeout_secs,
            readiness_timeout_secs,
            readiness_probe_interval_secs,
            secret_ttl_secs,
            log_ring_capacity,
            runpod_graphql_url,
            runpod_template_id,
        }
    }

    /// Absolute worker callback URL for a given deployment id.
    pub fn worker_webhook_url(&self, deployment_id: &str) -> String {
        format!(
            "{}/internal/deployment-ready/{}?secret={}",
            self.base_url.trim_end_matches('/'),
            deployment_id,
            self.internal_secret
        )
    }
}
