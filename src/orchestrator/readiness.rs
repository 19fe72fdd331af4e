//! Readiness probe fallback (spec §4.5 "Readiness probe fallback").
//!
//! Exists because worker callbacks may be lost or delayed: POSTs a
//! synthetic debug inference to `<endpoint_root>/runsync` on an interval
//! until the worker reports ready, fails, or the monitor times out.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    StillWarming,
    Failed,
}

/// Probe `run_url` (the `/run`-suffixed invocation URL) once.
///
/// The probe itself targets `/runsync` — the synchronous variant of the
/// same endpoint — so the derivation strips a trailing `/run` and appends
/// `/runsync`.
pub async fn probe_once(client: &Client, run_url: &str, timeout_secs: u64) -> ProbeOutcome {
    let runsync_url = if let Some(root) = run_url.strip_suffix("/run") {
        format!("{root}/runsync")
    } else {
        format!("{}/runsync", run_url.trim_end_matches('/'))
    };

    let resp = client
        .post(&runsync_url)
        .timeout(Duration::from_secs(timeout_secs))
        .json(&json!({ "input": { "debug": true } }))
        .send()
        .await;

    let Ok(resp) = resp else {
        return ProbeOutcome::StillWarming;
    };

    let Ok(body) = resp.json::<serde_json::Value>().await else {
        return ProbeOutcome::StillWarming;
    };

    classify(&body)
}

/// Classify a probe response body per spec §4.5.
///
/// Treated as informational only (spec §9 "readiness-probe failure-message
/// heuristic is fragile") — a misclassification never produces an
/// incorrect terminal state on its own; the worker callback remains the
/// authoritative signal.
fn classify(body: &serde_json::Value) -> ProbeOutcome {
    let status = body.get("status").and_then(|v| v.as_str()).unwrap_or("");
    let pipeline_loaded = body
        .get("pipeline_loaded")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if status.eq_ignore_ascii_case("OK") && pipeline_loaded {
        return ProbeOutcome::Ready;
    }
    if status.eq_ignore_ascii_case("FAILED") {
        return ProbeOutcome::Failed;
    }
    if matches!(
        status.to_uppercase().as_str(),
        "IN_QUEUE" | "IN_PROGRESS" | "RUNNING" | "LOADING"
    ) {
        return ProbeOutcome::StillWarming;
    }
    let body_text = body.to_string().to_lowercase();
    if body_text.contains("still loading") {
        return ProbeOutcome::StillWarming;
    }
    ProbeOutcome::StillWarming
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ready_response() {
        let body = json!({ "status": "OK", "pipeline_loaded": true });
        assert_eq!(classify(&body), ProbeOutcome::Ready);
    }

    #[test]
    fn classifies_warming_statuses() {
        for s in ["IN_QUEUE", "IN_PROGRESS", "RUNNING", "LOADING"] {
            let body = json!({ "status": s });
            assert_eq!(classify(&body), ProbeOutcome::StillWarming);
        }
    }

    #[test]
    fn classifies_failed_status() {
        let body = json!({ "status": "FAILED" });
        assert_eq!(classify(&body), ProbeOutcome::Failed);
    }

    #[test]
    fn still_loading_text_is_informational_warming() {
        let body = json!({ "status": "UNKNOWN", "message": "model still loading" });
        assert_eq!(classify(&body), ProbeOutcome::StillWarming);
    }
}
