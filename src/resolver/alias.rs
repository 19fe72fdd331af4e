//! Short `(provider, model_name)` alias resolution to canonical HF ids
//! (spec §4.2 "Alias resolution").

use crate::error::OrchestratorError;

/// One alias table entry. `provider: None` matches any provider (fallback).
struct Alias {
    provider: Option<&'static str>,
    name: &'static str,
    hf_id: &'static str,
}

const ALIASES: &[Alias] = &[
    Alias { provider: None, name: "flux-schnell", hf_id: "black-forest-labs/FLUX.1-schnell" },
    Alias { provider: None, name: "flux-dev", hf_id: "black-forest-labs/FLUX.1-dev" },
    Alias { provider: None, name: "sd-turbo", hf_id: "stabilityai/sd-turbo" },
    Alias { provider: None, name: "sdxl", hf_id: "stabilityai/stable-diffusion-xl-base-1.0" },
    Alias { provider: Some("fal"), name: "flux-schnell", hf_id: "black-forest-labs/FLUX.1-schnell" },
];

/// Resolve a `(provider, model_name)` alias to its canonical HF id.
///
/// Looks for a provider-scoped entry first, then falls back to the
/// `provider: None` entries. An unresolved alias is an `InvalidRequest`
/// (spec §4.2), surfaced to the client as `InvalidDeploymentRequest` (400)
/// with both inputs echoed back in `details` (spec §8 scenario 5).
pub fn resolve_alias(model_name: &str, provider: Option<&str>) -> Result<String, OrchestratorError> {
    if let Some(provider) = provider {
        if let Some(a) = ALIASES
            .iter()
            .find(|a| a.provider == Some(provider) && a.name == model_name)
        {
            return Ok(a.hf_id.to_string());
        }
    }

    if let Some(a) = ALIASES
        .iter()
        .find(|a| a.provider.is_none() && a.name == model_name)
    {
        return Ok(a.hf_id.to_string());
    }

    Err(OrchestratorError::UnknownModel {
        model_name: model_name.to_string(),
        provider: provider.unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_alias() {
        assert_eq!(
            resolve_alias("flux-schnell", None).unwrap(),
            "black-forest-labs/FLUX.1-schnell"
        );
    }

    #[test]
    fn unknown_alias_is_rejected() {
        let err = resolve_alias("nonexistent", Some("fal")).unwrap_err();
        match err {
            OrchestratorError::UnknownModel { model_name, provider } => {
                assert_eq!(model_name, "nonexistent");
                assert_eq!(provider, "fal");
            }
            _ => panic!("expected UnknownModel"),
        }
    }
}
