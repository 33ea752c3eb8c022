//! The `graalsystems_workspace` resource.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{copy_fields, str_field, Api, ResourceHandler};
use crate::client::ResourceKind;
use crate::error::ProviderError;
use crate::models;
use crate::schema::{Attribute, Schema};
use crate::variant::ConfigMap;

/// Workspace applications the platform can deploy.
pub const WORKSPACE_TYPES: &[&str] = &["jupyter", "metabase", "superset", "vscode", "zeppelin"];

const FIELDS: &[&str] = &[
    "name",
    "description",
    "type",
    "infrastructure_id",
    "instance_type",
    "owner",
    "status",
    "version",
    "public_url",
];

/// An interactive workspace, owned by the user the provider runs as.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceResource;

#[async_trait]
impl ResourceHandler for WorkspaceResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Workspace
    }

    fn schema(&self) -> Schema {
        let computed = |description: &str| Attribute::computed_string().with_description(description);
        Schema::v0()
            .with_description("An interactive workspace")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_description("The name of the workspace"))
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the workspace"),
            )
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_description("The application of the workspace")
                    .with_allowed_values(WORKSPACE_TYPES.iter().copied())
                    .with_force_new(),
            )
            .with_attribute(
                "infrastructure_id",
                Attribute::required_string()
                    .with_description("The id of the infrastructure the workspace runs on")
                    .with_force_new(),
            )
            .with_attribute(
                "instance_type",
                Attribute::required_string()
                    .with_description("The compute instance type of the workspace")
                    .with_force_new(),
            )
            .with_attribute("owner", computed("The id of the user owning the workspace"))
            .with_attribute("status", computed("The status of the workspace"))
            .with_attribute("version", computed("The version of the workspace application"))
            .with_attribute("public_url", computed("The url of the workspace"))
    }

    fn patchable(&self) -> &'static [&'static str] {
        &["name", "description"]
    }

    async fn body(&self, api: Api<'_>, planned: &Value) -> Result<Value, ProviderError> {
        let user = api.client.current_user(api.tenant).await?;
        let owner = str_field(&user, "id");
        if owner.is_empty() {
            return Err(ProviderError::Sdk("the current user has no id".to_string()));
        }
        debug!(owner = %owner, "workspace owner resolved");

        let workspace = models::Workspace {
            name: str_field(planned, "name"),
            description: str_field(planned, "description"),
            kind: str_field(planned, "type"),
            infrastructure_id: str_field(planned, "infrastructure_id"),
            instance_type: str_field(planned, "instance_type"),
            owner,
        };
        Ok(serde_json::to_value(workspace)?)
    }

    fn flatten(&self, remote: &Value) -> Result<ConfigMap, ProviderError> {
        Ok(copy_fields(remote, FIELDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryClient;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_schema_rejects_unknown_type() {
        let config = json!({
            "name": "notebooks",
            "type": "rstudio",
            "infrastructure_id": "infra-1",
            "instance_type": "small"
        });
        let diagnostics = validate(&WorkspaceResource.schema(), &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("type".to_string()));
    }

    #[tokio::test]
    async fn test_body_sets_owner() {
        let client = InMemoryClient::new();
        let api = Api {
            client: &client,
            tenant: "acme",
        };
        let body = WorkspaceResource
            .body(
                api,
                &json!({"name": "notebooks", "type": "jupyter", "infrastructure_id": "infra-1", "instance_type": "small"}),
            )
            .await
            .unwrap();
        assert_eq!(body["owner"], InMemoryClient::CURRENT_USER_ID);
        assert_eq!(body["type"], "jupyter");
    }
}
