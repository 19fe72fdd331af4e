//! visgate — a GPU inference-deployment orchestrator.
//!
//! Accepts a Hugging Face model reference plus provider credentials, decides
//! whether an existing warm serverless endpoint can satisfy the request,
//! otherwise provisions a new one on the configured GPU-serverless provider,
//! and delivers a single terminal "ready" webhook once the worker reports
//! in.
//!
//! # Endpoints
//!
//! | Method   | Path                                     | Description                         |
//! |----------|-------------------------------------------|--------------------------------------|
//! | `POST`   | `/v1/deployments`                         | Create a deployment                  |
//! | `GET`    | `/v1/deployments/{id}`                    | Current record projection            |
//! | `GET`    | `/v1/deployments/{id}/stream`             | SSE status stream                    |
//! | `GET`    | `/v1/deployments/{id}/logs/stream`        | SSE log stream                       |
//! | `DELETE` | `/v1/deployments/{id}`                    | Teardown                             |
//! | `POST`   | `/internal/deployment-ready/{id}`         | Worker lifecycle callback            |
//! | `POST`   | `/internal/logs/{id}`                     | Worker log tunnel                    |
//! | `POST`   | `/internal/cleanup/{id}`                  | Worker-initiated teardown            |
//! | `POST`   | `/internal/tasks/orchestrate-deployment`  | Task-queue trampoline                |
//! | `GET`    | `/health` / `/readiness` / `/metrics`     | Operational endpoints                |

pub mod auth;
pub mod config;
pub mod error;
pub mod gpu;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod rate_limit;
pub mod redact;
pub mod resolver;
pub mod server;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{OrchestratorError, OrchestratorResult};
pub use state::AppState;
