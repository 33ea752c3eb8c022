//! Request bodies sent to the GraalSystems API.
//!
//! Field names match the API. Polymorphic members are the resolved variant
//! types, so their `type` discriminator is written by serde.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::variants::{JobOptions, Library, Schedule, Task};

/// Body of a project, identity or group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Named {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// Body of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    /// Login name.
    pub username: String,
    /// Free-form description.
    pub description: String,
}

/// Body of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Workspace {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Workspace application.
    #[serde(rename = "type")]
    pub kind: String,
    /// Infrastructure the workspace is deployed on.
    pub infrastructure_id: String,
    /// Compute instance type.
    pub instance_type: String,
    /// Id of the user owning the workspace.
    pub owner: String,
}

/// Body of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning project.
    pub project_id: String,
    /// Identity the job runs as.
    pub identity_id: String,
    /// How the job runs.
    pub options: JobOptions,
    /// Maximum duration of a run.
    pub timeout_seconds: i64,
    /// Retries after a failed run.
    pub max_retries: i64,
    /// Run parameters.
    pub parameters: Vec<String>,
    /// Secret ids exposed to the run.
    pub secrets: Vec<String>,
    /// Labels.
    pub labels: BTreeMap<String, String>,
    /// When the job runs; absent for jobs triggered by workflows only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    /// Libraries made available to the run.
    pub libraries: Vec<Library>,
}

/// Body of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workflow {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning project.
    pub project_id: String,
    /// Identity the tasks run as.
    pub identity_id: String,
    /// When the workflow runs.
    pub schedule: Schedule,
    /// Tasks, in declaration order.
    pub tasks: Vec<Task>,
    /// Labels.
    pub labels: BTreeMap<String, String>,
}
