//! Workflow tasks and their dependency ordering.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DependencyReason, ResolveError};
use crate::variant::{resolve, Variant, VariantSpec, DISCRIMINATOR};

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Task {
    /// Run an existing job.
    Job(JobTask),
}

/// A task that runs a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTask {
    /// Id of the job to run.
    #[serde(rename = "ref")]
    pub job_id: String,
    /// Name of the task within the workflow.
    pub name: String,
    /// Names of the tasks that must finish first.
    pub depends_on: Vec<String>,
}

impl Task {
    /// Name of the task within the workflow.
    pub fn name(&self) -> &str {
        match self {
            Self::Job(t) => &t.name,
        }
    }

    /// Names of the tasks this one waits for.
    pub fn depends_on(&self) -> &[String] {
        match self {
            Self::Job(t) => &t.depends_on,
        }
    }
}

impl Variant for Task {
    const ENTITY: &'static str = "task";
    const SPECS: &'static [VariantSpec] = &[VariantSpec {
        name: "job",
        required: &["ref", "name"],
        forbidden: &[],
    }];

    fn kind(&self) -> &'static str {
        match self {
            Self::Job(_) => "job",
        }
    }

    fn check(&self) -> Vec<ResolveError> {
        match self {
            Self::Job(t) => match Uuid::parse_str(&t.job_id) {
                Ok(_) => Vec::new(),
                Err(e) => vec![ResolveError::InvalidValue {
                    entity: Self::ENTITY,
                    variant: "job".to_string(),
                    field: "ref".to_string(),
                    reason: format!("must be a valid UUID, got {:?}: {}", t.job_id, e),
                }],
            },
        }
    }
}

/// Check the ordering of a declared task sequence.
///
/// The first task may not declare dependencies, and every dependency of a
/// later task must name a task declared before it. Names are compared after
/// trimming whitespace. Duplicate names are accepted. Since only backward
/// references are allowed, a sequence that passes cannot contain a cycle.
pub fn validate_task_sequence(tasks: &[Value]) -> Result<(), ResolveError> {
    let mut declared: Vec<String> = Vec::with_capacity(tasks.len());

    for (position, task) in tasks.iter().enumerate() {
        let name = task
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ResolveError::MissingField {
                entity: Task::ENTITY,
                variant: task_kind(task),
                field: "name".to_string(),
            })?;

        for dependency in dependencies(task)? {
            let dependency = dependency.trim();
            let reason = if position == 0 {
                Some(DependencyReason::FirstTask)
            } else if !declared.iter().any(|d| d == dependency) {
                Some(DependencyReason::Undefined)
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(ResolveError::DependencyError {
                    task: name.to_string(),
                    dependency: dependency.to_string(),
                    reason,
                });
            }
        }

        declared.push(name.to_string());
    }

    debug!(tasks = declared.len(), "task sequence validated");
    Ok(())
}

/// Validate a task sequence, then resolve every task.
///
/// `default_kind` is inserted as the discriminator of tasks that carry none;
/// a workflow's `job` blocks are all `job` tasks.
pub fn resolve_tasks(tasks: &[Value], default_kind: Option<&str>) -> Result<Vec<Task>, ResolveError> {
    validate_task_sequence(tasks)?;

    tasks
        .iter()
        .map(|task| match (task, default_kind) {
            (Value::Object(map), Some(kind)) if crate::variant::is_empty(map.get(DISCRIMINATOR)) => {
                let mut map = map.clone();
                map.insert(DISCRIMINATOR.to_string(), Value::String(kind.to_string()));
                resolve::<Task>(&Value::Object(map))
            },
            _ => resolve::<Task>(task),
        })
        .collect()
}

fn task_kind(task: &Value) -> String {
    task.get(DISCRIMINATOR)
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .unwrap_or("job")
        .to_string()
}

fn dependencies(task: &Value) -> Result<Vec<&str>, ResolveError> {
    match task.get("depends_on") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| ResolveError::Malformed {
                    entity: Task::ENTITY,
                    variant: task_kind(task),
                    message: format!("depends_on entries must be strings, got {}", item),
                })
            })
            .collect(),
        Some(other) => Err(ResolveError::Malformed {
            entity: Task::ENTITY,
            variant: task_kind(task),
            message: format!("depends_on must be a list, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::read_back;
    use serde_json::json;

    const JOB_A: &str = "2f1c4a5e-8a61-4b8e-9d0c-6a2b1f3e7d10";
    const JOB_B: &str = "7b3e9d21-0c4f-4e6a-8b5d-1f2a3c4d5e6f";

    #[test]
    fn test_sequence_with_backward_dependency() {
        let tasks = vec![
            json!({"name": "a", "depends_on": []}),
            json!({"name": "b", "depends_on": ["a"]}),
        ];
        assert!(validate_task_sequence(&tasks).is_ok());
    }

    #[test]
    fn test_first_task_cannot_depend() {
        let tasks = vec![json!({"name": "a", "depends_on": ["x"]})];
        let err = validate_task_sequence(&tasks).unwrap_err();
        assert_eq!(
            err,
            ResolveError::DependencyError {
                task: "a".to_string(),
                dependency: "x".to_string(),
                reason: DependencyReason::FirstTask,
            }
        );
    }

    #[test]
    fn test_undefined_dependency() {
        let tasks = vec![
            json!({"name": "a", "depends_on": []}),
            json!({"name": "b", "depends_on": ["c"]}),
        ];
        let err = validate_task_sequence(&tasks).unwrap_err();
        assert_eq!(
            err,
            ResolveError::DependencyError {
                task: "b".to_string(),
                dependency: "c".to_string(),
                reason: DependencyReason::Undefined,
            }
        );
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let tasks = vec![
            json!({"name": "a"}),
            json!({"name": "b", "depends_on": ["c"]}),
            json!({"name": "c", "depends_on": ["a"]}),
        ];
        let err = validate_task_sequence(&tasks).unwrap_err();
        assert!(matches!(err, ResolveError::DependencyError { ref dependency, .. } if dependency == "c"));
    }

    #[test]
    fn test_names_are_trimmed_and_duplicates_allowed() {
        let tasks = vec![
            json!({"name": " extract "}),
            json!({"name": "extract", "depends_on": ["extract"]}),
            json!({"name": "load", "depends_on": ["  extract"]}),
        ];
        assert!(validate_task_sequence(&tasks).is_ok());
    }

    #[test]
    fn test_missing_name() {
        let err = validate_task_sequence(&[json!({"depends_on": []})]).unwrap_err();
        assert!(matches!(err, ResolveError::MissingField { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_resolve_tasks_injects_default_kind() {
        let tasks = resolve_tasks(
            &[
                json!({"ref": JOB_A, "name": "extract", "depends_on": []}),
                json!({"ref": JOB_B, "name": "load", "depends_on": ["extract"]}),
            ],
            Some("job"),
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].name(), "load");
        assert_eq!(tasks[1].depends_on(), ["extract".to_string()]);
    }

    #[test]
    fn test_task_kind_has_no_default() {
        let err = resolve_tasks(&[json!({"ref": JOB_A, "name": "a"})], None).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidVariant { value: None, .. }));
    }

    #[test]
    fn test_ref_must_be_uuid() {
        let err = resolve::<Task>(&json!({"type": "job", "ref": "not-a-uuid", "name": "a"})).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidValue { ref field, .. } if field == "ref"));
    }

    #[test]
    fn test_read_back_job_task() {
        let flat = read_back::<Task>(&json!({
            "type": "job",
            "ref": JOB_A,
            "name": "extract",
            "depends_on": []
        }))
        .unwrap();
        assert_eq!(
            Value::Object(flat[0].clone()),
            json!({"type": "job", "ref": JOB_A, "name": "extract", "depends_on": []})
        );

        let err = read_back::<Task>(&json!({"type": "notebook", "name": "n"})).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedVariant { ref value, .. } if value == "notebook"));
    }
}
