//! SSE status and log streams (spec §4.6, §5 "Cancellation").

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde_json::json;

use crate::auth::{extract_bearer, user_hash};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::state::AppState;
use crate::store::DeploymentStore;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    deployment_id: &str,
) -> Result<(), OrchestratorError> {
    let bearer = extract_bearer(headers)?;
    let hash = user_hash(bearer);
    state
        .store
        .get(deployment_id)
        .await
        .filter(|d| d.user_hash == hash)
        .map(|_| ())
        .ok_or(OrchestratorError::DeploymentNotFound)
}

/// `GET /v1/deployments/{id}/stream` — one `status` event per status
/// change, polled every 2s; ends once the deployment reaches a terminal
/// status (spec §4.6, §5).
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> OrchestratorResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    authorize(&state, &headers, &id).await?;

    let stream = stream! {
        let mut last_status = None;
        loop {
            let Some(deployment) = state.store.get(&id).await else {
                yield Ok(Event::default().event("status").data(json!({"status": "deleted"}).to_string()));
                break;
            };
            let current = deployment.status.to_string();
            if last_status.as_ref() != Some(&current) {
                yield Ok(Event::default().event("status").data(json!({
                    "status": current,
                    "endpoint_url": deployment.endpoint_url,
                    "error": deployment.error,
                }).to_string()));
                last_status = Some(current);
            }
            if deployment.status.is_terminal() {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `GET /v1/deployments/{id}/logs/stream` — emits `log` events from the
/// live log ring since the last line seen by this connection.
pub async fn logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> OrchestratorResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    authorize(&state, &headers, &id).await?;

    let stream = stream! {
        let mut since = chrono::Utc::now() - chrono::Duration::seconds(1);
        loop {
            let Some(deployment) = state.store.get(&id).await else { break };

            for line in state.logs.since(&id, since) {
                since = line.timestamp;
                yield Ok(Event::default().event("log").data(json!({
                    "timestamp": line.timestamp.to_rfc3339(),
                    "level": line.level.to_string(),
                    "message": line.message,
                }).to_string()));
            }

            if deployment.status.is_terminal() {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
