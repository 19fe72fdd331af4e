//! User webhook delivery (spec §4.5 step 6, §7 "Retries").

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::models::Deployment;

/// Build the terminal "ready" payload delivered to `user_webhook_url`
/// (spec §6 "User webhook delivered payload").
pub fn build_payload(deployment: &Deployment, duration_seconds: i64) -> Value {
    let endpoint_url = deployment.endpoint_url.clone().unwrap_or_default();
    json!({
        "event": "deployment_ready",
        "deployment_id": deployment.deployment_id,
        "status": "ready",
        "endpoint_url": endpoint_url,
        "runpod_endpoint_id": deployment.runpod_endpoint_id,
        "model_id": deployment.hf_model_id,
        "gpu_allocated": deployment.gpu_allocated,
        "created_at": deployment.created_at.to_rfc3339(),
        "ready_at": deployment.ready_at.map(|t| t.to_rfc3339()),
        "duration_seconds": duration_seconds,
        "usage_example": {
            "method": "POST",
            "url": endpoint_url,
            "headers": { "Authorization": "Bearer <YOUR_PROVIDER_API_KEY>" },
            "body": {
                "input": {
                    "prompt": "a photograph of an astronaut riding a horse",
                    "num_inference_steps": 28,
                    "guidance_scale": 3.5,
                }
            }
        }
    })
}

/// Deliver `payload` to `url`, retrying up to 3 attempts with `2^n` second
/// backoff between attempts (spec §5, §7). Returns `Ok(())` only if some
/// attempt received a successful (2xx) response.
pub async fn deliver(
    client: &Client,
    url: &str,
    payload: &Value,
    timeout_secs: u64,
) -> Result<(), String> {
    let mut last_err = String::new();

    for attempt in 0..3u32 {
        let result = client
            .post(url)
            .timeout(Duration::from_secs(timeout_secs))
            .json(payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => {
                last_err = format!("webhook returned status {}", resp.status());
            }
            Err(e) => {
                last_err = format!("webhook request failed: {e}");
            }
        }

        if attempt < 2 {
            tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Deployment, DeploymentStatus};

    fn sample() -> Deployment {
        Deployment {
            deployment_id: "dep_2026_aaaaaaaa".to_string(),
            status: DeploymentStatus::Ready,
            hf_model_id: "black-forest-labs/FLUX.1-schnell".to_string(),
            user_webhook_url: "https://httpbin.org/post".to_string(),
            gpu_tier: None,
            region: None,
            runpod_endpoint_id: Some("xyz".to_string()),
            endpoint_url: Some("https://api.runpod.ai/v2/xyz/run".to_string()),
            gpu_allocated: Some("A40".to_string()),
            model_vram_gb: Some(24),
            logs: Vec::new(),
            error: None,
            created_at: chrono::Utc::now(),
            ready_at: Some(chrono::Utc::now()),
            user_hash: "hash".to_string(),
            provider: "runpod".to_string(),
            endpoint_name: "visgate-hash-flux".to_string(),
            pool_policy: "on-demand".to_string(),
        }
    }

    #[test]
    fn payload_echoes_model_and_run_suffixed_url() {
        let payload = build_payload(&sample(), 42);
        assert_eq!(
            payload["model_id"],
            json!("black-forest-labs/FLUX.1-schnell")
        );
        assert!(payload["endpoint_url"].as_str().unwrap().ends_with("/run"));
        assert_eq!(payload["duration_seconds"], json!(42));
    }

    #[tokio::test]
    async fn delivery_succeeds_against_mock_server() {
        let server = wiremock_stub_server().await;
        let client = Client::new();
        let payload = build_payload(&sample(), 1);
        let result = deliver(&client, &format!("{}/webhook", server.0), &payload, 5).await;
        assert!(result.is_ok());
        server.1.abort();
    }

    // Minimal loopback HTTP server so this test has no external dependency
    // beyond tokio — the crate's real webhook tests use wiremock (see
    // tests/scenarios.rs) but a dev-dependency-free smoke test lives here.
    async fn wiremock_stub_server() -> (String, tokio::task::JoinHandle<()>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
                    .await;
            }
        });
        (format!("http://{addr}"), handle)
    }
}
