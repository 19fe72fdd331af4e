//! Runpod GraphQL provider adapter (spec §4.3, §9 "Dynamic dispatch").

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::OrchestratorError;
use crate::provider::{is_capacity_error, CreateEndpointOptions, CreatedEndpoint, EndpointSummary, ProviderAdapter};

pub struct RunpodAdapter {
    client: Client,
    graphql_url: String,
}

impl RunpodAdapter {
    pub fn new(graphql_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            graphql_url: graphql_url.into(),
        }
    }

    async fn graphql(
        &self,
        api_key: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, OrchestratorError> {
        let url = format!("{}?api_key={}", self.graphql_url, api_key);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| OrchestratorError::ProviderApi {
                message: format!("request to Runpod failed: {e}"),
                is_capacity: false,
            })?;

        let body: Value = resp.json().await.map_err(|e| OrchestratorError::ProviderApi {
            message: format!("invalid Runpod response: {e}"),
            is_capacity: false,
        })?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if let Some(first) = errors.first() {
                let message = first
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown Runpod error")
                    .to_string();
                let is_capacity = is_capacity_error(&message);
                return Err(OrchestratorError::ProviderApi { message, is_capacity });
            }
        }

        Ok(body)
    }
}

#[async_trait]
impl ProviderAdapter for RunpodAdapter {
    async fn create_endpoint(
        &self,
        name: &str,
        gpu_id: &str,
        image: &str,
        env: &HashMap<String, String>,
        api_key: &str,
        opts: &CreateEndpointOptions,
    ) -> Result<CreatedEndpoint, OrchestratorError> {
        let env_array: Vec<Value> = env
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v }))
            .collect();

        let query = r#"
            mutation saveEndpoint($input: EndpointInput!) {
                saveEndpoint(input: $input) { id name }
            }
        "#;

        let variables = json!({
            "input": {
                "name": name,
                "gpuIds": gpu_id,
                "imageName": image,
                "env": env_array,
                "templateId": opts.template_id,
                "workersMin": opts.workers_min.unwrap_or(0),
                "workersMax": opts.workers_max.unwrap_or(1),
                "idleTimeout": opts.idle_timeout_secs.unwrap_or(5),
                "scalerType": opts.scaler_type.clone().unwrap_or_else(|| "QUEUE_DELAY".to_string()),
                "scalerValue": opts.scaler_value.unwrap_or(4),
                "volumeInGb": opts.volume_gb.unwrap_or(0),
                "locations": opts.locations.clone(),
            }
        });

        let body = self.graphql(api_key, query, variables).await?;

        let id = body
            .get("data")
            .and_then(|d| d.get("saveEndpoint"))
            .and_then(|e| e.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| OrchestratorError::ProviderApi {
                message: "Runpod saveEndpoint response missing id".to_string(),
                is_capacity: false,
            })?
            .to_string();

        Ok(CreatedEndpoint {
            url: self.run_url(&id),
            id,
        })
    }

    async fn delete_endpoint(&self, id: &str, api_key: &str) -> Result<(), OrchestratorError> {
        let query = r#"
            mutation deleteEndpoint($id: String!) {
                deleteEndpoint(id: $id)
            }
        "#;
        // Best-effort: swallow errors, the caller never propagates them.
        let _ = self.graphql(api_key, query, json!({ "id": id })).await;
        Ok(())
    }

    async fn list_endpoints(
        &self,
        api_key: &str,
    ) -> Result<Vec<EndpointSummary>, OrchestratorError> {
        let query = r#"
            query myself {
                myself { endpoints { id name status } }
            }
        "#;
        let body = self.graphql(api_key, query, json!({})).await?;

        let endpoints = body
            .get("data")
            .and_then(|d| d.get("myself"))
            .and_then(|m| m.get("endpoints"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(endpoints
            .into_iter()
            .filter_map(|e| {
                let id = e.get("id")?.as_str()?.to_string();
                let name = e.get("name")?.as_str()?.to_string();
                let status = e
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN")
                    .to_string();
                let url = self.run_url(&id);
                Some(EndpointSummary { id, name, status, url })
            })
            .collect())
    }

    fn run_url(&self, id: &str) -> String {
        format!("https://api.runpod.ai/v2/{id}/run")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_url_derivation_is_pure() {
        let adapter = RunpodAdapter::new("https://api.runpod.io/graphql", 30);
        assert_eq!(adapter.run_url("xyz"), "https://api.runpod.ai/v2/xyz/run");
    }
}
