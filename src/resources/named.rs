//! Projects, identities, groups and users: a name and a description.

use async_trait::async_trait;
use serde_json::Value;

use super::{copy_fields, str_field, Api, ResourceHandler};
use crate::client::ResourceKind;
use crate::error::ProviderError;
use crate::models;
use crate::schema::{Attribute, Schema};
use crate::variant::ConfigMap;

/// A resource made of a name and a description.
#[derive(Debug, Clone, Copy)]
pub struct NamedResource {
    kind: ResourceKind,
    name_attribute: &'static str,
    name_required: bool,
}

impl NamedResource {
    /// `graalsystems_project`.
    pub fn project() -> Self {
        Self {
            kind: ResourceKind::Project,
            name_attribute: "name",
            name_required: false,
        }
    }

    /// `graalsystems_identity`.
    pub fn identity() -> Self {
        Self {
            kind: ResourceKind::Identity,
            name_attribute: "name",
            name_required: true,
        }
    }

    /// `graalsystems_group`.
    pub fn group() -> Self {
        Self {
            kind: ResourceKind::Group,
            name_attribute: "name",
            name_required: true,
        }
    }

    /// `graalsystems_user`, named by its `username`.
    pub fn user() -> Self {
        Self {
            kind: ResourceKind::User,
            name_attribute: "username",
            name_required: true,
        }
    }
}

#[async_trait]
impl ResourceHandler for NamedResource {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn schema(&self) -> Schema {
        let name = if self.name_required {
            Attribute::required_string()
        } else {
            Attribute::optional_string()
        };
        Schema::v0()
            .with_description(format!("A GraalSystems {}", self.kind))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                self.name_attribute,
                name.with_description(format!("The {} of the {}", self.name_attribute, self.kind)),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description(format!("The description of the {}", self.kind)),
            )
    }

    fn name_attribute(&self) -> &'static str {
        self.name_attribute
    }

    fn patchable(&self) -> &'static [&'static str] {
        match self.kind {
            ResourceKind::User => &["username", "description"],
            _ => &["name", "description"],
        }
    }

    async fn body(&self, _api: Api<'_>, planned: &Value) -> Result<Value, ProviderError> {
        let description = str_field(planned, "description");
        let body = match self.kind {
            ResourceKind::User => serde_json::to_value(models::User {
                username: str_field(planned, "username"),
                description,
            })?,
            _ => serde_json::to_value(models::Named {
                name: str_field(planned, "name"),
                description,
            })?,
        };
        Ok(body)
    }

    fn flatten(&self, remote: &Value) -> Result<ConfigMap, ProviderError> {
        Ok(copy_fields(remote, &[self.name_attribute, "description"]))
    }
}
