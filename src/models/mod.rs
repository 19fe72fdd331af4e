//! Wire and record types shared across the orchestrator.

pub mod deployment;
pub mod request;

pub use deployment::{generate_deployment_id, Deployment, DeploymentStatus, LogLevel, LogLine};
pub use request::{
    CacheScope, CleanupRequest, CreateDeploymentRequest, CreateDeploymentResponse,
    DeploymentView, Path, Task, WorkerCallback,
};
