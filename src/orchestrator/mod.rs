//! Deployment Orchestration Engine (spec §4.5) — the service's core state
//! machine, plus its three collaborators: warm-reuse discovery, webhook
//! delivery, and the readiness probe fallback.

pub mod engine;
pub mod readiness;
pub mod warm;
pub mod webhook;

pub use engine::{
    create_deployment, delete_deployment, handle_cleanup, handle_worker_callback,
    mark_ready_and_notify, run_workflow,
};
