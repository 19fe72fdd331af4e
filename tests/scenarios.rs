//! End-to-end scenarios against the full axum router, with the Runpod
//! GraphQL endpoint and the user webhook both faked via `wiremock`.

use std::net::SocketAddr;
use std::time::Duration;

use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{Match, Mock, MockServer, Request as WiremockRequest, Respond, ResponseTemplate};

use visgate::{server, AppState, Config};

struct BodyContains(&'static str);

impl Match for BodyContains {
    fn matches(&self, request: &WiremockRequest) -> bool {
        String::from_utf8_lossy(&request.body).contains(self.0)
    }
}

/// Fails the first `saveEndpoint` call with a capacity error, then succeeds
/// on every call after — models a provider that rejects the first GPU
/// candidate but has room for the next one in the rotation.
struct CapacityThenSuccess {
    calls: AtomicUsize,
}

impl Respond for CapacityThenSuccess {
    fn respond(&self, _request: &WiremockRequest) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "no capacity available for this GPU type" }]
            }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "data": { "saveEndpoint": { "id": "ep-fallback-1", "name": "visgate-x-sdxl" } }
            }))
        }
    }
}

fn test_config(graphql_url: &str) -> Config {
    let mut config = Config::default();
    config.runpod_graphql_url = graphql_url.to_string();
    config.readiness_probe_interval_secs = 1;
    config.readiness_timeout_secs = 5;
    config
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(body.map(|b| b.to_string()).unwrap_or_default()))
        .unwrap();

    let mut request = request;
    request
        .extensions_mut()
        .insert(axum::extract::ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn wait_for_status(
    app: &axum::Router,
    id: &str,
    bearer: &str,
    target: &str,
    attempts: u32,
) -> Value {
    for _ in 0..attempts {
        let (status, body) = send(
            app.clone(),
            "GET",
            &format!("/v1/deployments/{id}"),
            Some(bearer),
            None,
        )
        .await;
        if status == StatusCode::OK && body["status"] == json!(target) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("deployment {id} never reached status {target}");
}

async fn empty_endpoint_list(mock: &MockServer) {
    Mock::given(wiremock::matchers::method("POST"))
        .and(BodyContains("myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "myself": { "endpoints": [] } }
        })))
        .mount(mock)
        .await;
}

#[tokio::test]
async fn cold_flux_schnell_reaches_ready_and_delivers_webhook() {
    let runpod = MockServer::start().await;
    let webhook = MockServer::start().await;

    empty_endpoint_list(&runpod).await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(BodyContains("saveEndpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "saveEndpoint": { "id": "ep-flux-1", "name": "visgate-x-flux" } }
        })))
        .mount(&runpod)
        .await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&webhook)
        .await;

    let state = AppState::new(test_config(&runpod.uri()));
    let app = server::build_app(state.clone());

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/deployments",
        Some("rpa_TEST_COLD"),
        Some(json!({
            "hf_model_id": "black-forest-labs/FLUX.1-schnell",
            "gpu_tier": "A40",
            "user_webhook_url": format!("{}/webhook", webhook.uri()),
            "user_runpod_key": "rpk_live",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["path"], json!("cold"));
    assert_eq!(body["status"], json!("accepted_cold"));
    assert_eq!(body["estimated_ready_seconds"], json!(180));
    assert_eq!(body["poll_interval_seconds"], json!(5));
    let deployment_id = body["deployment_id"].as_str().unwrap().to_string();

    // Wait for the background workflow to finish provisioning before racing
    // the worker callback in, so it can't be overtaken by the workflow's own
    // later status patches.
    wait_for_status(&app, &deployment_id, "rpa_TEST_COLD", "loading_model", 20).await;

    // Worker reports ready once the (faked) endpoint is up.
    let (cb_status, _) = send(
        app.clone(),
        "POST",
        &format!(
            "/internal/deployment-ready/{deployment_id}?secret={}",
            state.config.internal_secret
        ),
        None,
        Some(json!({ "status": "ready" })),
    )
    .await;
    assert_eq!(cb_status, StatusCode::NO_CONTENT);

    let ready = wait_for_status(&app, &deployment_id, "rpa_TEST_COLD", "ready", 20).await;
    assert_eq!(ready["hf_model_id"], json!("black-forest-labs/FLUX.1-schnell"));
    assert!(ready["endpoint_url"].as_str().unwrap().ends_with("/run"));

    let deliveries = webhook.received_requests().await.unwrap();
    let webhook_call = deliveries
        .iter()
        .find(|r| r.url.path() == "/webhook")
        .expect("webhook should have been called");
    let payload: Value = serde_json::from_slice(&webhook_call.body).unwrap();
    assert_eq!(payload["event"], json!("deployment_ready"));
    assert_eq!(payload["model_id"], json!("black-forest-labs/FLUX.1-schnell"));
    assert!(payload["duration_seconds"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn warm_endpoint_short_circuits_to_ready_immediately() {
    let runpod = MockServer::start().await;
    let webhook = MockServer::start().await;

    let bearer = "rpa_TEST_WARM";
    let hash10 = visgate::auth::user_hash_prefix10(bearer);
    let warm_name = format!("visgate-{hash10}-black-forest-labs--FLUX.1-schnell");

    Mock::given(wiremock::matchers::method("POST"))
        .and(BodyContains("myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "myself": { "endpoints": [
                { "id": "ep-warm-1", "name": warm_name, "status": "RUNNING" }
            ] } }
        })))
        .mount(&runpod)
        .await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&webhook)
        .await;

    let state = AppState::new(test_config(&runpod.uri()));
    let app = server::build_app(state);

    let (status, body) = send(
        app,
        "POST",
        "/v1/deployments",
        Some(bearer),
        Some(json!({
            "hf_model_id": "black-forest-labs/FLUX.1-schnell",
            "user_webhook_url": format!("{}/webhook", webhook.uri()),
            "user_runpod_key": "rpk_live",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["path"], json!("warm"));
    assert_eq!(body["status"], json!("warm_ready"));
    assert_eq!(body["estimated_ready_seconds"], json!(0));
    assert!(body["endpoint_url"].as_str().unwrap().ends_with("/run"));
}

#[tokio::test]
async fn capacity_error_rotates_to_next_candidate() {
    let runpod = MockServer::start().await;
    let webhook = MockServer::start().await;

    empty_endpoint_list(&runpod).await;

    // First saveEndpoint call simulates a capacity error; the retry on the
    // next candidate succeeds.
    Mock::given(wiremock::matchers::method("POST"))
        .and(BodyContains("saveEndpoint"))
        .respond_with(CapacityThenSuccess { calls: AtomicUsize::new(0) })
        .mount(&runpod)
        .await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&webhook)
        .await;

    let state = AppState::new(test_config(&runpod.uri()));
    let app = server::build_app(state.clone());

    let (status, body) = send(
        app.clone(),
        "POST",
        "/v1/deployments",
        Some("rpa_TEST_CAP"),
        Some(json!({
            "hf_model_id": "stabilityai/stable-diffusion-xl-base-1.0",
            "gpu_tier": "A40",
            "user_webhook_url": format!("{}/webhook", webhook.uri()),
            "user_runpod_key": "rpk_live",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let deployment_id = body["deployment_id"].as_str().unwrap().to_string();

    // Give the background workflow time to rotate past the capacity error
    // and reach loading_model.
    let record = wait_for_status(&app, &deployment_id, "rpa_TEST_CAP", "loading_model", 30).await;
    assert_ne!(record["gpu_allocated"], Value::Null);
}

#[tokio::test]
async fn unknown_alias_is_rejected_with_both_inputs_echoed() {
    let runpod = MockServer::start().await;
    let state = AppState::new(test_config(&runpod.uri()));
    let app = server::build_app(state);

    let (status, body) = send(
        app,
        "POST",
        "/v1/deployments",
        Some("rpa_TEST_ALIAS"),
        Some(json!({
            "model_name": "nonexistent-model",
            "provider": "fal",
            "user_webhook_url": "https://httpbin.org/post",
            "user_runpod_key": "rpk_live",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("InvalidDeploymentRequest"));
    assert_eq!(body["details"]["model_name"], json!("nonexistent-model"));
    assert_eq!(body["details"]["provider"], json!("fal"));
}

#[tokio::test]
async fn tenancy_mismatch_returns_404_not_403() {
    let runpod = MockServer::start().await;
    empty_endpoint_list(&runpod).await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(BodyContains("saveEndpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "saveEndpoint": { "id": "ep-tenancy-1", "name": "visgate-x-sdturbo" } }
        })))
        .mount(&runpod)
        .await;

    let state = AppState::new(test_config(&runpod.uri()));
    let app = server::build_app(state);

    let (_, create_body) = send(
        app.clone(),
        "POST",
        "/v1/deployments",
        Some("rpa_OWNER"),
        Some(json!({
            "hf_model_id": "stabilityai/sd-turbo",
            "user_webhook_url": "https://httpbin.org/post",
            "user_runpod_key": "rpk_live",
        })),
    )
    .await;
    let deployment_id = create_body["deployment_id"].as_str().unwrap();

    let (status, body) = send(
        app,
        "GET",
        &format!("/v1/deployments/{deployment_id}"),
        Some("rpa_SOMEONE_ELSE"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("DeploymentNotFound"));
}

#[tokio::test]
async fn rate_limit_returns_429_with_retry_after() {
    let runpod = MockServer::start().await;
    empty_endpoint_list(&runpod).await;
    let mut config = test_config(&runpod.uri());
    config.rate_limit_per_min = 1;
    let state = AppState::new(config);
    let app = server::build_app(state);

    let body = json!({
        "hf_model_id": "stabilityai/sd-turbo",
        "user_webhook_url": "https://httpbin.org/post",
        "user_runpod_key": "rpk_live",
    });

    let (first_status, _) = send(app.clone(), "POST", "/v1/deployments", Some("rpa_RATE"), Some(body.clone())).await;
    assert_eq!(first_status, StatusCode::ACCEPTED);

    let (second_status, second_body) =
        send(app, "POST", "/v1/deployments", Some("rpa_RATE"), Some(body)).await;
    assert_eq!(second_status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second_body["error"], json!("RateLimit"));
    assert!(second_body["details"]["retry_after_seconds"].as_u64().unwrap() > 0);
}
