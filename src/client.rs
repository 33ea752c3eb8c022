//! The GraalSystems REST API, as seen by the provider.
//!
//! HTTP transport and token acquisition live behind [`GraalClient`]; the
//! provider only ever hands it fully-resolved JSON bodies and JSON-patch
//! updates. Implementations map HTTP failures with
//! [`ProviderError::from_status`] so that a 404 is always
//! [`ProviderError::NotFound`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// The kinds of objects the API manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A project, the parent of jobs and workflows.
    Project,
    /// An identity jobs run as.
    Identity,
    /// A job.
    Job,
    /// A platform user.
    User,
    /// A group of users.
    Group,
    /// An interactive workspace.
    Workspace,
    /// A workflow of jobs.
    Workflow,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResourceKind; 7] = [
        Self::Project,
        Self::Identity,
        Self::Job,
        Self::User,
        Self::Group,
        Self::Workspace,
        Self::Workflow,
    ];

    /// Singular name, as used in resource type names and id attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Identity => "identity",
            Self::Job => "job",
            Self::User => "user",
            Self::Group => "group",
            Self::Workspace => "workspace",
            Self::Workflow => "workflow",
        }
    }

    /// Path segment of the collection.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Identity => "identities",
            Self::Job => "jobs",
            Self::User => "users",
            Self::Group => "groups",
            Self::Workspace => "workspaces",
            Self::Workflow => "workflows",
        }
    }

    /// Kind of the parent the object is created under, if any.
    pub fn parent(&self) -> Option<ResourceKind> {
        match self {
            Self::Job | Self::Workflow => Some(Self::Project),
            _ => None,
        }
    }

    /// Name of the attribute holding this kind's id in data sources.
    pub fn id_attribute(&self) -> String {
        format!("{}_id", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One JSON-patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// Operation name.
    pub op: String,
    /// JSON pointer of the target field.
    pub path: String,
    /// New value.
    pub value: Value,
}

impl Patch {
    /// Replace a top-level field.
    pub fn replace(field: &str, value: Value) -> Self {
        Self {
            op: "replace".to_string(),
            path: format!("/{}", field),
            value,
        }
    }

    /// The top-level field this patch targets.
    pub fn field(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

/// Access to the GraalSystems REST API.
///
/// Every call is scoped to a tenant, sent as the `X-Tenant` header.
#[async_trait]
pub trait GraalClient: Send + Sync {
    /// Create an object, under `parent` when the kind lives in a project.
    async fn create(
        &self,
        tenant: &str,
        kind: ResourceKind,
        parent: Option<&str>,
        body: Value,
    ) -> Result<Value, ProviderError>;

    /// Fetch one object by id.
    async fn find(&self, tenant: &str, kind: ResourceKind, id: &str) -> Result<Value, ProviderError>;

    /// List every object of a kind.
    async fn list(&self, tenant: &str, kind: ResourceKind) -> Result<Vec<Value>, ProviderError>;

    /// Apply JSON-patch operations to an object.
    async fn update(
        &self,
        tenant: &str,
        kind: ResourceKind,
        id: &str,
        patches: Vec<Patch>,
    ) -> Result<Value, ProviderError>;

    /// Delete an object.
    async fn delete(&self, tenant: &str, kind: ResourceKind, id: &str) -> Result<(), ProviderError>;

    /// The user the provider is authenticated as.
    async fn current_user(&self, tenant: &str) -> Result<Value, ProviderError>;
}
