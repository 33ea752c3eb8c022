//! The `graalsystems_job` resource.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    block_list, blocks, copy_fields, int_field, merge_block_errors, str_field, typed_field, Api, BlockError,
    ResourceHandler,
};
use crate::client::ResourceKind;
use crate::error::{ProviderError, ResolveError};
use crate::models;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::variant::{read_back, read_back_all, resolve, resolve_all, ConfigMap, Variant};
use crate::variants::{JobOptions, Library, Schedule};

const SCALARS: &[&str] = &[
    "name",
    "description",
    "project_id",
    "identity_id",
    "timeout_seconds",
    "max_retries",
    "parameters",
    "secrets",
    "labels",
];

/// A job: how it runs, when, and with which libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobResource;

impl JobResource {
    /// Resolve every polymorphic block of a job configuration.
    ///
    /// Violations of all blocks are reported together.
    pub fn resolve(config: &Value) -> Result<(JobOptions, Option<Schedule>, Vec<Library>), ResolveError> {
        Self::resolve_blocks(config).map_err(|errors| merge_block_errors(&errors))
    }

    /// Same as [`JobResource::resolve`], with each failure tagged by its
    /// block (`options`, `schedule` or `library`).
    pub fn resolve_blocks(config: &Value) -> Result<(JobOptions, Option<Schedule>, Vec<Library>), Vec<BlockError>> {
        let options = match blocks(config, "options").first() {
            Some(block) => resolve::<JobOptions>(block),
            None => Err(ResolveError::InvalidVariant {
                entity: JobOptions::ENTITY,
                value: None,
                allowed: JobOptions::allowed(),
            }),
        };
        let schedule = blocks(config, "schedule")
            .first()
            .map(resolve::<Schedule>)
            .transpose();
        let libraries = resolve_all::<Library>(&blocks(config, "library"));

        match (options, schedule, libraries) {
            (Ok(options), Ok(schedule), Ok(libraries)) => Ok((options, schedule, libraries)),
            (options, schedule, libraries) => Err([
                ("options", options.err()),
                ("schedule", schedule.err()),
                ("library", libraries.err()),
            ]
            .into_iter()
            .filter_map(|(block, err)| err.map(|err| (block, err)))
            .collect()),
        }
    }

    fn options_block() -> Block {
        Block::new()
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_description("Type of the job")
                    .with_allowed_values(JobOptions::allowed()),
            )
            .with_attribute(
                "env",
                Attribute::optional_string_map().with_description("Key value pairs of environment variables for the job"),
            )
            .with_attribute(
                "docker_image",
                Attribute::required_string().with_description("Docker image to use for the job"),
            )
            .with_attribute(
                "instance_type",
                Attribute::required_string().with_description(
                    "Compute instance type to use for the job. Check which instance types are available for your project",
                ),
            )
            .with_attribute(
                "lines",
                Attribute::optional_string_list().with_description("List of bash lines to execute. Only used if type is `bash`"),
            )
            .with_attribute(
                "module",
                Attribute::optional_string().with_description("Python module to execute. Only used if type is `python`"),
            )
    }

    fn library_block() -> Block {
        let only = |field: &str, variant: &str| format!("{}. Only used if type is `{}`", field, variant);
        Block::new()
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_description("Library type, file by default")
                    .with_allowed_values(Library::allowed())
                    .with_default(json!("file")),
            )
            .with_attribute("key", Attribute::optional_string().with_description(only("Id of the uploaded library", "file")))
            .with_attribute("url", Attribute::optional_string().with_description(only("Repository url", "git")))
            .with_attribute("path", Attribute::optional_string().with_description(only("Path inside the repository", "git")))
            .with_attribute("revision", Attribute::optional_string().with_description(only("Revision to check out", "git")))
            .with_attribute("username", Attribute::optional_string().with_description(only("Username to connect to git", "git")))
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .with_description(only("Password to connect to git", "git"))
                    .sensitive(),
            )
            .with_attribute("repo", Attribute::optional_string().with_description(only("Repository url", "maven")))
            .with_attribute("dependency", Attribute::optional_string().with_description(only("Artifact coordinates", "maven")))
            .with_attribute("dep", Attribute::optional_string().with_description(only("Requirement specifier", "pypi")))
            .with_attribute("ref", Attribute::optional_string().with_description(only("Package reference", "cran")))
    }
}

/// The block shared by jobs and workflows.
pub(crate) fn schedule_block() -> Block {
    let cron = |description: &str| {
        Attribute::optional_string().with_description(format!("{}. Only used if type is `cron`", description))
    };
    Block::new()
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_description("Schedule mode, either `once` or `cron`")
                .with_allowed_values(Schedule::allowed()),
        )
        .with_attribute("cron_expression", cron("Cron expression of the schedule"))
        .with_attribute("timezone", cron("Timezone of the schedule"))
        .with_attribute("infrastructure_id", cron("Infrastructure id used for the schedule"))
        .with_attribute("device_id", cron("Device id"))
}

#[async_trait]
impl ResourceHandler for JobResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Job
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A job run on GraalSystems")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_description("The name of the job"))
            .with_attribute("description", Attribute::optional_string().with_description("The description of the job"))
            .with_attribute(
                "project_id",
                Attribute::required_string()
                    .with_description("The id of the project the job belongs to")
                    .with_force_new(),
            )
            .with_attribute(
                "identity_id",
                Attribute::required_string()
                    .with_description("The id of the identity used to run the job")
                    .with_force_new(),
            )
            .with_attribute(
                "timeout_seconds",
                Attribute::optional_int64()
                    .with_description("Maximum duration of the job")
                    .with_minimum(1),
            )
            .with_attribute(
                "max_retries",
                Attribute::optional_int64()
                    .with_description("Maximum retries in case of failure")
                    .with_minimum(0),
            )
            .with_attribute("parameters", Attribute::optional_string_list().with_description("List of parameters"))
            .with_attribute("secrets", Attribute::optional_string_list().with_description("List of secret ids"))
            .with_attribute("labels", Attribute::optional_string_map().with_description("Labels of the job"))
            .with_block(
                "options",
                NestedBlock::list(Self::options_block().with_description("Job definition options"))
                    .with_min_items(1)
                    .with_max_items(1)
                    .with_force_new(),
            )
            .with_block(
                "schedule",
                NestedBlock::list(schedule_block().with_description("Schedule mode of the job"))
                    .with_max_items(1)
                    .with_force_new(),
            )
            .with_block(
                "library",
                NestedBlock::list(Self::library_block().with_description("Libraries to use for the job run"))
                    .with_force_new(),
            )
    }

    fn patchable(&self) -> &'static [&'static str] {
        &[
            "name",
            "description",
            "timeout_seconds",
            "max_retries",
            "parameters",
            "secrets",
            "labels",
        ]
    }

    fn check_blocks(&self, config: &Value) -> Result<(), Vec<BlockError>> {
        Self::resolve_blocks(config).map(|_| ())
    }

    async fn body(&self, _api: Api<'_>, planned: &Value) -> Result<Value, ProviderError> {
        let (options, schedule, libraries) = Self::resolve(planned)?;
        debug!(
            options = options.kind(),
            schedule = schedule.as_ref().map(Variant::kind).unwrap_or("none"),
            libraries = libraries.len(),
            "job blocks resolved"
        );

        let job = models::Job {
            name: str_field(planned, "name"),
            description: str_field(planned, "description"),
            project_id: str_field(planned, "project_id"),
            identity_id: str_field(planned, "identity_id"),
            options,
            timeout_seconds: int_field(planned, "timeout_seconds"),
            max_retries: int_field(planned, "max_retries"),
            parameters: typed_field(planned, "parameters")?,
            secrets: typed_field(planned, "secrets")?,
            labels: typed_field::<BTreeMap<String, String>>(planned, "labels")?,
            schedule,
            libraries,
        };
        Ok(serde_json::to_value(job)?)
    }

    fn flatten(&self, remote: &Value) -> Result<ConfigMap, ProviderError> {
        let mut state = copy_fields(remote, SCALARS);
        let options = read_back::<JobOptions>(remote.get("options").unwrap_or(&Value::Null))?;
        let schedule = read_back::<Schedule>(remote.get("schedule").unwrap_or(&Value::Null))?;
        let libraries = read_back_all::<Library>(remote.get("libraries").unwrap_or(&Value::Null))?;
        state.insert("options".to_string(), block_list(options));
        state.insert("schedule".to_string(), block_list(schedule));
        state.insert("library".to_string(), block_list(libraries));
        Ok(state)
    }
}
