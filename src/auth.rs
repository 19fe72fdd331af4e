//! Stateless bearer-token authentication.
//!
//! The caller's provider API key doubles as the bearer credential; there is
//! no separate identity store. `user_hash = SHA-256(token)` scopes every
//! tenant-bound read and write (spec §3 invariant 5, §4.6).

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::error::OrchestratorError;

/// Extract the bearer token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, OrchestratorError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(OrchestratorError::Unauthorized)
}

/// `user_hash = SHA-256(token)`, hex-encoded.
pub fn user_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 10 hex characters of the user hash, used in warm-endpoint naming
/// (`visgate-<hash10>-<slug>`, spec §4.5 / Glossary).
pub fn user_hash_prefix10(token: &str) -> String {
    user_hash(token)[..10].to_string()
}
