//! Model Resolver & Capability Oracle (spec §4.2).

pub mod alias;
pub mod hf;
pub mod vram;

pub use alias::resolve_alias;

use crate::error::OrchestratorError;
use crate::models::Task;

/// Registry entry for task-support checking. A registry miss means
/// "assume compatible" (spec §4.2 "Task check").
fn declared_tasks(hf_model_id: &str) -> Option<&'static [Task]> {
    match hf_model_id {
        "black-forest-labs/FLUX.1-schnell" | "black-forest-labs/FLUX.1-dev" => {
            Some(&[Task::Text2img, Task::Image2img])
        }
        "stabilityai/sd-turbo" => Some(&[Task::Text2img]),
        "stabilityai/stable-diffusion-xl-base-1.0" => Some(&[Task::Text2img, Task::Image2img]),
        _ => None,
    }
}

/// Verify that `hf_model_id` supports `task`, when the caller supplied one.
pub fn check_task_support(hf_model_id: &str, task: Option<Task>) -> Result<(), OrchestratorError> {
    let Some(task) = task else {
        return Ok(());
    };
    match declared_tasks(hf_model_id) {
        None => Ok(()), // registry miss: assume compatible
        Some(tasks) if tasks.contains(&task) => Ok(()),
        Some(_) => Err(OrchestratorError::InvalidRequest(format!(
            "model '{hf_model_id}' does not support task {task:?}"
        ))),
    }
}

/// Resolve the caller's model reference (either an explicit HF id or a
/// short alias) to a canonical HF id.
pub fn resolve_model_id(
    hf_model_id: Option<&str>,
    model_name: Option<&str>,
    provider: Option<&str>,
) -> Result<String, OrchestratorError> {
    match (hf_model_id, model_name) {
        (Some(id), None) => Ok(id.to_string()),
        (None, Some(name)) => resolve_alias(name, provider),
        _ => Err(OrchestratorError::InvalidRequest(
            "exactly one of hf_model_id or model_name must be set".to_string(),
        )),
    }
}

/// Estimate required VRAM for `hf_model_id` using only the curated
/// registry and conservative default (the safetensors/param-count paths
/// require a live HF lookup and are invoked separately by the
/// orchestration engine when the registry misses).
pub fn estimate_vram_gb(hf_model_id: &str) -> u32 {
    vram::estimate_vram_gb(hf_model_id, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_of_hf_model_id_or_model_name_required() {
        assert!(resolve_model_id(None, None, None).is_err());
        assert!(resolve_model_id(
            Some("black-forest-labs/FLUX.1-schnell"),
            Some("flux-schnell"),
            None
        )
        .is_err());
    }

    #[test]
    fn task_check_passes_on_registry_miss() {
        assert!(check_task_support("unknown/model", Some(Task::Text2video)).is_ok());
    }

    #[test]
    fn task_check_rejects_unsupported_task() {
        let err =
            check_task_support("stabilityai/sd-turbo", Some(Task::Text2video)).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidRequest(_)));
    }
}
