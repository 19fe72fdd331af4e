//! Hugging Face Hub existence check (spec §4.2 "HF existence check").

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::OrchestratorError;

/// Check that `hf_model_id` exists on the HF Hub.
///
/// Up to 3 attempts with exponential backoff on HTTP 429; 404 or a
/// "not found" body maps to `HFModelNotFound`. Overall timeout is
/// `hf_timeout_secs + 2s` (spec §4.2).
pub async fn check_model_exists(
    client: &Client,
    hf_model_id: &str,
    hf_token: Option<&str>,
    hf_timeout_secs: u64,
) -> Result<(), OrchestratorError> {
    let url = format!("https://huggingface.co/api/models/{hf_model_id}");
    let overall_timeout = Duration::from_secs(hf_timeout_secs) + Duration::from_secs(2);
    let deadline = tokio::time::Instant::now() + overall_timeout;

    let mut last_err: Option<OrchestratorError> = None;

    for attempt in 0..3u32 {
        if tokio::time::Instant::now() >= deadline {
            break;
        }

        let mut req = client
            .get(&url)
            .timeout(Duration::from_secs(hf_timeout_secs))
            .header("Accept", "application/json");
        if let Some(token) = hf_token {
            req = req.bearer_auth(token);
        }

        match req.send().await {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                return Err(OrchestratorError::HfModelNotFound(hf_model_id.to_string()));
            }
            Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                last_err = Some(OrchestratorError::ProviderApi {
                    message: "HF Hub rate limited the validation request".to_string(),
                    is_capacity: false,
                });
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
                continue;
            }
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                if body.to_lowercase().contains("not found") {
                    return Err(OrchestratorError::HfModelNotFound(hf_model_id.to_string()));
                }
                return Ok(());
            }
            Err(e) => {
                last_err = Some(OrchestratorError::Internal(format!(
                    "HF Hub request failed: {e}"
                )));
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        OrchestratorError::Internal("HF Hub validation timed out".to_string())
    }))
}
