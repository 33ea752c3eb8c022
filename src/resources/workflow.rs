//! The `graalsystems_workflow` resource.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::job::schedule_block;
use super::{
    block_list, blocks, copy_fields, merge_block_errors, str_field, typed_field, Api, BlockError, ResourceHandler,
};
use crate::client::ResourceKind;
use crate::error::{ProviderError, ResolveError};
use crate::models;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::variant::{read_back, read_back_all, resolve, ConfigMap, Variant};
use crate::variants::{resolve_tasks, Schedule, Task};

const SCALARS: &[&str] = &["name", "description", "project_id", "identity_id", "labels"];

/// A workflow: a schedule and an ordered list of job tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowResource;

impl WorkflowResource {
    /// Resolve the schedule and the task sequence of a workflow
    /// configuration.
    pub fn resolve(config: &Value) -> Result<(Schedule, Vec<Task>), ResolveError> {
        Self::resolve_blocks(config).map_err(|errors| merge_block_errors(&errors))
    }

    /// Same as [`WorkflowResource::resolve`], with each failure tagged by
    /// its block (`schedule` or `job`).
    pub fn resolve_blocks(config: &Value) -> Result<(Schedule, Vec<Task>), Vec<BlockError>> {
        let schedule = match blocks(config, "schedule").first() {
            Some(block) => resolve::<Schedule>(block),
            None => Err(ResolveError::InvalidVariant {
                entity: Schedule::ENTITY,
                value: None,
                allowed: Schedule::allowed(),
            }),
        };
        let tasks = resolve_tasks(&blocks(config, "job"), Some("job"));

        match (schedule, tasks) {
            (Ok(schedule), Ok(tasks)) => Ok((schedule, tasks)),
            (schedule, tasks) => Err([("schedule", schedule.err()), ("job", tasks.err())]
                .into_iter()
                .filter_map(|(block, err)| err.map(|err| (block, err)))
                .collect()),
        }
    }

    fn task_block() -> Block {
        Block::new()
            .with_description("Tasks of the workflow, in execution order")
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_description("Task type, job by default")
                    .with_allowed_values(Task::allowed())
                    .with_default(json!("job")),
            )
            .with_attribute("ref", Attribute::required_string().with_description("The id of the job to run"))
            .with_attribute("name", Attribute::required_string().with_description("The name of the task"))
            .with_attribute(
                "depends_on",
                Attribute::optional_string_list().with_description("Names of earlier tasks this one waits for"),
            )
    }
}

#[async_trait]
impl ResourceHandler for WorkflowResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Workflow
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A workflow of jobs")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_description("The name of the workflow"))
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the workflow"),
            )
            .with_attribute(
                "project_id",
                Attribute::required_string()
                    .with_description("The id of the project the workflow belongs to")
                    .with_force_new(),
            )
            .with_attribute(
                "identity_id",
                Attribute::required_string()
                    .with_description("The id of the identity used to run the workflow")
                    .with_force_new(),
            )
            .with_attribute("labels", Attribute::optional_string_map().with_description("Labels of the workflow"))
            .with_block(
                "schedule",
                NestedBlock::list(schedule_block().with_description("Schedule mode of the workflow"))
                    .with_min_items(1)
                    .with_max_items(1)
                    .with_force_new(),
            )
            .with_block("job", NestedBlock::list(Self::task_block()).with_force_new())
    }

    fn patchable(&self) -> &'static [&'static str] {
        &["name", "description", "labels"]
    }

    fn check_blocks(&self, config: &Value) -> Result<(), Vec<BlockError>> {
        Self::resolve_blocks(config).map(|_| ())
    }

    async fn body(&self, _api: Api<'_>, planned: &Value) -> Result<Value, ProviderError> {
        let (schedule, tasks) = Self::resolve(planned)?;
        debug!(schedule = schedule.kind(), tasks = tasks.len(), "workflow resolved");

        let workflow = models::Workflow {
            name: str_field(planned, "name"),
            description: str_field(planned, "description"),
            project_id: str_field(planned, "project_id"),
            identity_id: str_field(planned, "identity_id"),
            schedule,
            tasks,
            labels: typed_field::<BTreeMap<String, String>>(planned, "labels")?,
        };
        Ok(serde_json::to_value(workflow)?)
    }

    fn flatten(&self, remote: &Value) -> Result<ConfigMap, ProviderError> {
        let mut state = copy_fields(remote, SCALARS);
        let schedule = read_back::<Schedule>(remote.get("schedule").unwrap_or(&Value::Null))?;
        let tasks = read_back_all::<Task>(remote.get("tasks").unwrap_or(&Value::Null))?;
        state.insert("schedule".to_string(), block_list(schedule));
        state.insert("job".to_string(), block_list(tasks));
        Ok(state)
    }
}
