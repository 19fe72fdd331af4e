//! Warm-reuse short-circuit (spec §4.5).

use crate::auth::user_hash_prefix10;
use crate::error::OrchestratorError;
use crate::provider::{is_dead_status, EndpointSummary, ProviderAdapter};

/// Slugify an HF model id the way warm-endpoint names do: `/` → `--`.
pub fn slug(hf_id: &str) -> String {
    hf_id.replace('/', "--")
}

/// Names that qualify as a warm match for this caller/model (Glossary
/// "Warm endpoint", spec §4.5).
fn candidate_names(bearer_token: &str, hf_model_id: &str) -> [String; 2] {
    let hash10 = user_hash_prefix10(bearer_token);
    let model_slug = slug(hf_model_id);
    [
        format!("visgate-{hash10}-{model_slug}"),
        format!("visgate-pool-{model_slug}"),
    ]
}

/// Find a live, non-terminal endpoint matching the deterministic per-caller
/// or pool naming convention.
pub async fn find_warm_endpoint(
    provider: &dyn ProviderAdapter,
    api_key: &str,
    bearer_token: &str,
    hf_model_id: &str,
) -> Result<Option<EndpointSummary>, OrchestratorError> {
    let names = candidate_names(bearer_token, hf_model_id);
    let endpoints = provider.list_endpoints(api_key).await?;
    Ok(endpoints
        .into_iter()
        .find(|e| names.contains(&e.name) && !is_dead_status(&e.status)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_round_trips_by_known_inverse() {
        let hf_id = "black-forest-labs/FLUX.1-schnell";
        let slugged = slug(hf_id);
        assert_eq!(slugged, "black-forest-labs--FLUX.1-schnell");
        assert_eq!(slugged.replace("--", "/"), hf_id);
    }

    #[test]
    fn candidate_names_match_spec_convention() {
        let names = candidate_names("rpa_TEST", "black-forest-labs/FLUX.1-schnell");
        assert!(names[0].starts_with("visgate-"));
        assert!(names[1].starts_with("visgate-pool-"));
    }
}
