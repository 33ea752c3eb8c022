//! GraalSystems resources and data sources.
//!
//! Each resource type implements [`ResourceHandler`]: its schema, how to
//! turn planned state into a request body, and how to flatten an API object
//! back into state. The CRUD flow around those hooks is shared and lives in
//! this module.

mod job;
mod named;
mod workflow;
mod workspace;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::{GraalClient, Patch, ResourceKind};
use crate::error::{ProviderError, ResolveError};
use crate::plan::same;
use crate::schema::{Attribute, Schema};
use crate::variant::ConfigMap;

pub use job::JobResource;
pub use named::NamedResource;
pub use workflow::WorkflowResource;
pub use workspace::WorkspaceResource;

/// Prefix of every resource and data source type name.
pub const TYPE_PREFIX: &str = "graalsystems_";

/// A resolution failure and the configuration block it was found in.
pub type BlockError = (&'static str, ResolveError);

/// Merge the failures of several blocks into one error, one violation
/// per entry.
pub fn merge_block_errors(errors: &[BlockError]) -> ResolveError {
    let violations = errors
        .iter()
        .flat_map(|(_, err)| err.violations())
        .cloned()
        .collect();
    ResolveError::collect(violations).unwrap_or(ResolveError::Multiple(Vec::new()))
}

/// A client bound to the configured tenant.
#[derive(Clone, Copy)]
pub struct Api<'a> {
    /// The REST client.
    pub client: &'a dyn GraalClient,
    /// Tenant of every call.
    pub tenant: &'a str,
}

/// The per-type part of a GraalSystems resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The API object kind.
    fn kind(&self) -> ResourceKind;

    /// Resource and data source type name.
    fn type_name(&self) -> String {
        format!("{}{}", TYPE_PREFIX, self.kind())
    }

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Attribute that identifies objects by name in data source lookups.
    fn name_attribute(&self) -> &'static str {
        "name"
    }

    /// Attributes that can change in place, as JSON-patch replace ops.
    fn patchable(&self) -> &'static [&'static str];

    /// Resolve the polymorphic blocks of a configuration, keeping every
    /// failure with the block it came from.
    fn check_blocks(&self, config: &Value) -> Result<(), Vec<BlockError>> {
        let _ = config;
        Ok(())
    }

    /// Resolve the polymorphic blocks of a configuration.
    ///
    /// Runs during validation, plan, create and update, always before any
    /// call to the API.
    fn check(&self, config: &Value) -> Result<(), ProviderError> {
        self.check_blocks(config)
            .map_err(|errors| merge_block_errors(&errors).into())
    }

    /// Id of the object this one is created under, read from the
    /// parent kind's id attribute (`project_id` for jobs).
    fn parent(&self, planned: &Value) -> Option<String> {
        self.kind()
            .parent()
            .map(|parent| str_field(planned, &parent.id_attribute()))
    }

    /// Build the create request body.
    async fn body(&self, api: Api<'_>, planned: &Value) -> Result<Value, ProviderError>;

    /// Flatten an API object into state, without its `id`.
    fn flatten(&self, remote: &Value) -> Result<ConfigMap, ProviderError>;

    /// The data source schema: the resource schema, all optional and
    /// computed, plus a `<kind>_id` lookup key.
    fn data_source_schema(&self) -> Schema {
        let kind = self.kind();
        self.schema().as_data_source().with_attribute(
            kind.id_attribute(),
            Attribute::optional_string().with_description(format!("The ID of the {}", kind)),
        )
    }
}

/// Every GraalSystems resource handler, keyed by type name.
pub fn handlers() -> BTreeMap<String, Box<dyn ResourceHandler>> {
    let all: Vec<Box<dyn ResourceHandler>> = vec![
        Box::new(NamedResource::project()),
        Box::new(NamedResource::identity()),
        Box::new(NamedResource::group()),
        Box::new(NamedResource::user()),
        Box::new(JobResource),
        Box::new(WorkspaceResource),
        Box::new(WorkflowResource),
    ];
    all.into_iter().map(|h| (h.type_name(), h)).collect()
}

/// Create an object and read it back.
pub async fn create(handler: &dyn ResourceHandler, api: Api<'_>, planned: &Value) -> Result<Value, ProviderError> {
    let kind = handler.kind();
    handler.check(planned)?;

    let body = handler.body(api, planned).await?;
    let parent = handler.parent(planned);
    let created = api.client.create(api.tenant, kind, parent.as_deref(), body).await?;

    let id = created
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Sdk(format!("{} created, but the API returned no id", kind)))?
        .to_string();
    info!(kind = %kind, id = %id, "object created");

    match read(handler, api, &id).await? {
        Value::Null => Err(ProviderError::Sdk(format!(
            "{} {} created, but could not retrieve its info. Check that every parameter you entered is valid",
            kind, id
        ))),
        state => Ok(state),
    }
}

/// Read an object into state.
///
/// Returns `Value::Null` when the object no longer exists, which drops it
/// from state.
pub async fn read(handler: &dyn ResourceHandler, api: Api<'_>, id: &str) -> Result<Value, ProviderError> {
    let kind = handler.kind();
    match api.client.find(api.tenant, kind, id).await {
        Ok(remote) => Ok(Value::Object(state(handler, id, &remote)?)),
        Err(e) if e.is_not_found() => {
            warn!(kind = %kind, id = %id, "object is gone, dropping it from state");
            Ok(Value::Null)
        },
        Err(e) => Err(e),
    }
}

/// Patch the attributes that changed, then read the object back.
pub async fn update(
    handler: &dyn ResourceHandler,
    api: Api<'_>,
    prior: &Value,
    planned: &Value,
) -> Result<Value, ProviderError> {
    let kind = handler.kind();
    handler.check(planned)?;
    let id = state_id(prior)?;

    let patches = diff_patches(prior, planned, handler.patchable());
    if patches.is_empty() {
        debug!(kind = %kind, id = %id, "nothing to patch");
    } else {
        debug!(kind = %kind, id = %id, patches = patches.len(), "patching object");
        api.client.update(api.tenant, kind, id, patches).await?;
    }

    match read(handler, api, id).await? {
        Value::Null => Err(ProviderError::NotFound(format!("{} {}", kind, id))),
        state => Ok(state),
    }
}

/// Delete an object. An object that is already gone counts as deleted.
pub async fn delete(handler: &dyn ResourceHandler, api: Api<'_>, current: &Value) -> Result<(), ProviderError> {
    let kind = handler.kind();
    let id = state_id(current)?;
    match api.client.delete(api.tenant, kind, id).await {
        Err(e) if e.is_not_found() => {
            debug!(kind = %kind, id = %id, "object already deleted");
            Ok(())
        },
        other => other,
    }
}

/// Look an object up by `<kind>_id` or by name for a data source.
///
/// Exactly one of the two keys must be set. Names are compared after
/// trimming whitespace and must match exactly one object.
pub async fn lookup(handler: &dyn ResourceHandler, api: Api<'_>, config: &Value) -> Result<Value, ProviderError> {
    let kind = handler.kind();
    let id_attribute = kind.id_attribute();
    let name_attribute = handler.name_attribute();
    let id = str_field(config, &id_attribute);
    let name = str_field(config, name_attribute);
    let name = name.trim();

    let (id, remote) = match (id.is_empty(), name.is_empty()) {
        (false, false) => {
            return Err(ProviderError::Validation(format!(
                "only one of {} or {} can be set",
                id_attribute, name_attribute
            )))
        },
        (true, true) => {
            return Err(ProviderError::Validation(format!(
                "one of {} or {} must be set",
                id_attribute, name_attribute
            )))
        },
        (false, true) => {
            let remote = api.client.find(api.tenant, kind, &id).await?;
            (id, remote)
        },
        (true, false) => {
            let mut matches: Vec<Value> = api
                .client
                .list(api.tenant, kind)
                .await?
                .into_iter()
                .filter(|o| o.get(name_attribute).and_then(Value::as_str).map(str::trim) == Some(name))
                .collect();
            let remote = match matches.len() {
                0 => {
                    return Err(ProviderError::NotFound(format!(
                        "no {} found with the {} {}",
                        kind, name_attribute, name
                    )))
                },
                1 => matches.remove(0),
                n => {
                    return Err(ProviderError::Validation(format!(
                        "{} {} found with the same {} {}",
                        n,
                        kind.collection(),
                        name_attribute,
                        name
                    )))
                },
            };
            (str_field(&remote, "id"), remote)
        },
    };

    let mut state = state(handler, &id, &remote)?;
    state.insert(id_attribute, Value::String(id));
    Ok(Value::Object(state))
}

fn state(handler: &dyn ResourceHandler, id: &str, remote: &Value) -> Result<ConfigMap, ProviderError> {
    let mut state = handler.flatten(remote)?;
    state.insert("id".to_string(), Value::String(id.to_string()));
    Ok(state)
}

/// The `id` of a resource state.
pub fn state_id(state: &Value) -> Result<&str, ProviderError> {
    state
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest("resource state has no id".to_string()))
}

/// Replace ops for every patchable attribute that differs.
pub fn diff_patches(prior: &Value, planned: &Value, fields: &[&str]) -> Vec<Patch> {
    fields
        .iter()
        .filter(|field| !same(prior.get(**field), planned.get(**field)))
        .map(|field| {
            let value = planned.get(*field).cloned().unwrap_or(Value::Null);
            Patch::replace(field, value)
        })
        .collect()
}

/// A string attribute, empty when unset.
pub(crate) fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// An integer attribute, zero when unset.
pub(crate) fn int_field(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or_default()
}

/// Decode an optional attribute, falling back to its default when unset.
pub(crate) fn typed_field<T: DeserializeOwned + Default>(value: &Value, key: &str) -> Result<T, ProviderError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
            ProviderError::Validation(format!("invalid value for {}: {}", key, e))
        }),
    }
}

/// The items of a block list. A lone object counts as a one-item list.
pub(crate) fn blocks(value: &Value, key: &str) -> Vec<Value> {
    match value.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(item @ Value::Object(_)) => vec![item.clone()],
        _ => Vec::new(),
    }
}

/// Copy top-level fields of an API object; absent fields become null.
pub(crate) fn copy_fields(remote: &Value, fields: &[&str]) -> ConfigMap {
    fields
        .iter()
        .map(|field| (field.to_string(), remote.get(*field).cloned().unwrap_or(Value::Null)))
        .collect::<Map<String, Value>>()
}

/// Store a list of flattened blocks in state.
pub(crate) fn block_list(maps: Vec<ConfigMap>) -> Value {
    Value::Array(maps.into_iter().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handlers_cover_every_kind() {
        let handlers = handlers();
        let names: Vec<_> = handlers.keys().cloned().collect();
        assert_eq!(
            names,
            vec![
                "graalsystems_group",
                "graalsystems_identity",
                "graalsystems_job",
                "graalsystems_project",
                "graalsystems_user",
                "graalsystems_workflow",
                "graalsystems_workspace",
            ]
        );
        for kind in ResourceKind::ALL {
            assert!(handlers.values().any(|h| h.kind() == kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_parent_follows_kind() {
        let planned = json!({"name": "n", "project_id": "p-1"});
        assert_eq!(JobResource.parent(&planned).as_deref(), Some("p-1"));
        assert_eq!(WorkflowResource.parent(&planned).as_deref(), Some("p-1"));
        assert_eq!(NamedResource::project().parent(&planned), None);
        assert_eq!(WorkspaceResource.parent(&planned), None);
    }

    #[test]
    fn test_diff_patches() {
        let prior = json!({"id": "1", "name": "a", "description": ""});
        let planned = json!({"id": "1", "name": "b"});
        let patches = diff_patches(&prior, &planned, &["name", "description"]);
        assert_eq!(patches, vec![Patch::replace("name", json!("b"))]);
    }

    #[test]
    fn test_state_id() {
        assert_eq!(state_id(&json!({"id": "x"})).unwrap(), "x");
        assert!(matches!(
            state_id(&json!({"id": ""})),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_field_helpers() {
        let value = json!({"name": "n", "max_retries": 2, "labels": {"a": "b"}, "options": {"type": "bash"}});
        assert_eq!(str_field(&value, "name"), "n");
        assert_eq!(str_field(&value, "missing"), "");
        assert_eq!(int_field(&value, "max_retries"), 2);
        let labels: BTreeMap<String, String> = typed_field(&value, "labels").unwrap();
        assert_eq!(labels["a"], "b");
        let secrets: Vec<String> = typed_field(&value, "secrets").unwrap();
        assert!(secrets.is_empty());
        assert_eq!(blocks(&value, "options").len(), 1);
        assert!(blocks(&value, "schedule").is_empty());
        assert_eq!(copy_fields(&value, &["name", "status"])["status"], Value::Null);
    }
}
