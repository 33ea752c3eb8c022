//! Testing utilities.
//!
//! [`InMemoryClient`] stands in for the GraalSystems REST API and records
//! every call it receives. [`ProviderTester`] drives any [`ProviderService`]
//! through the same steps the infrastructure tool takes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use graalsystems_provider::testing::{InMemoryClient, ProviderTester};
//! use graalsystems_provider::GraalSystemsProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let client = Arc::new(InMemoryClient::new());
//! let tester = ProviderTester::new(GraalSystemsProvider::new(client.clone()));
//! tester.configure(InMemoryClient::provider_config()).await.unwrap();
//!
//! let state = tester
//!     .lifecycle_create("graalsystems_project", json!({"name": "analytics"}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["name"], "analytics");
//! # });
//! ```

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::client::{GraalClient, Patch, ResourceKind};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A call received by [`InMemoryClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    /// `create`, with the parent the object was posted under.
    Create {
        /// Object kind.
        kind: ResourceKind,
        /// Parent id.
        parent: Option<String>,
        /// Request body.
        body: Value,
    },
    /// `find`.
    Find {
        /// Object kind.
        kind: ResourceKind,
        /// Object id.
        id: String,
    },
    /// `list`.
    List {
        /// Object kind.
        kind: ResourceKind,
    },
    /// `update`.
    Update {
        /// Object kind.
        kind: ResourceKind,
        /// Object id.
        id: String,
        /// Patch operations.
        patches: Vec<Patch>,
    },
    /// `delete`.
    Delete {
        /// Object kind.
        kind: ResourceKind,
        /// Object id.
        id: String,
    },
    /// `current_user`.
    CurrentUser,
}

#[derive(Default)]
struct Store {
    objects: BTreeMap<(ResourceKind, String), Value>,
    calls: Vec<(String, ClientCall)>,
}

/// An in-memory GraalSystems API.
///
/// Objects get a random UUID on create and patches replace top-level
/// fields. Unknown ids fail with [`ProviderError::NotFound`], like a 404.
#[derive(Default)]
pub struct InMemoryClient {
    store: Mutex<Store>,
}

impl InMemoryClient {
    /// Id of the user returned by `current_user`.
    pub const CURRENT_USER_ID: &'static str = "5f0c7c2e-3d1b-4a8e-9f6a-2b7d4c1e8a90";

    /// An empty API.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider block that passes validation.
    pub fn provider_config() -> Value {
        json!({
            "tenant": "acme",
            "api_url": "https://api.graal.test",
            "auth_url": "https://auth.graal.test",
            "username": "terraform",
            "password": "secret"
        })
    }

    /// Store an object as if it had been created out of band. Returns its id.
    pub async fn insert(&self, kind: ResourceKind, mut object: Value) -> String {
        let id = Uuid::new_v4().to_string();
        if let Value::Object(map) = &mut object {
            map.insert("id".to_string(), Value::String(id.clone()));
        }
        self.store.lock().await.objects.insert((kind, id.clone()), object);
        id
    }

    /// The stored object, if any.
    pub async fn get(&self, kind: ResourceKind, id: &str) -> Option<Value> {
        self.store.lock().await.objects.get(&(kind, id.to_string())).cloned()
    }

    /// Drop an object without recording a call.
    pub async fn remove(&self, kind: ResourceKind, id: &str) -> Option<Value> {
        self.store.lock().await.objects.remove(&(kind, id.to_string()))
    }

    /// Every call received so far, oldest first.
    pub async fn calls(&self) -> Vec<ClientCall> {
        self.store.lock().await.calls.iter().map(|(_, call)| call.clone()).collect()
    }

    /// Tenants of every call received so far.
    pub async fn tenants(&self) -> Vec<String> {
        self.store.lock().await.calls.iter().map(|(tenant, _)| tenant.clone()).collect()
    }

    async fn record(&self, tenant: &str, call: ClientCall) {
        self.store.lock().await.calls.push((tenant.to_string(), call));
    }
}

fn not_found(kind: ResourceKind, id: &str) -> ProviderError {
    ProviderError::from_status(404, format!("{} {} not found", kind, id))
}

#[async_trait]
impl GraalClient for InMemoryClient {
    async fn create(
        &self,
        tenant: &str,
        kind: ResourceKind,
        parent: Option<&str>,
        body: Value,
    ) -> Result<Value, ProviderError> {
        self.record(
            tenant,
            ClientCall::Create {
                kind,
                parent: parent.map(str::to_string),
                body: body.clone(),
            },
        )
        .await;

        let id = self.insert(kind, body).await;
        self.get(kind, &id).await.ok_or_else(|| not_found(kind, &id))
    }

    async fn find(&self, tenant: &str, kind: ResourceKind, id: &str) -> Result<Value, ProviderError> {
        self.record(
            tenant,
            ClientCall::Find {
                kind,
                id: id.to_string(),
            },
        )
        .await;
        self.get(kind, id).await.ok_or_else(|| not_found(kind, id))
    }

    async fn list(&self, tenant: &str, kind: ResourceKind) -> Result<Vec<Value>, ProviderError> {
        self.record(tenant, ClientCall::List { kind }).await;
        let store = self.store.lock().await;
        Ok(store
            .objects
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn update(
        &self,
        tenant: &str,
        kind: ResourceKind,
        id: &str,
        patches: Vec<Patch>,
    ) -> Result<Value, ProviderError> {
        self.record(
            tenant,
            ClientCall::Update {
                kind,
                id: id.to_string(),
                patches: patches.clone(),
            },
        )
        .await;

        let mut store = self.store.lock().await;
        let object = store
            .objects
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| not_found(kind, id))?;
        if let Value::Object(map) = &mut *object {
            for patch in patches {
                map.insert(patch.field().to_string(), patch.value);
            }
        }
        Ok(object.clone())
    }

    async fn delete(&self, tenant: &str, kind: ResourceKind, id: &str) -> Result<(), ProviderError> {
        self.record(
            tenant,
            ClientCall::Delete {
                kind,
                id: id.to_string(),
            },
        )
        .await;
        self.remove(kind, id).await.map(|_| ()).ok_or_else(|| not_found(kind, id))
    }

    async fn current_user(&self, tenant: &str) -> Result<Value, ProviderError> {
        self.record(tenant, ClientCall::CurrentUser).await;
        Ok(json!({"id": Self::CURRENT_USER_ID, "username": "terraform"}))
    }
}

/// A test harness for [`ProviderService`] implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration, failing on error diagnostics.
    pub async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_resource_config(resource_type, config).await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(&self, resource_type: &str, proposed_state: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(&self, resource_type: &str, prior_state: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior_state, planned_state).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read data from a data source.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    /// Run plan, create and read. Returns the state after read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Run plan, update and read. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self.update(resource_type, prior_state, plan.planned_state).await?;
        self.read(resource_type, updated).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan creates a new resource.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "Expected plan to have changes for create, but got no changes");
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(plan.requires_replace, "Expected plan to require replacement, but it does not");
}

/// Assert that a plan updates in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(!plan.requires_replace, "Expected plan to update in place, but it requires replacement");
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not change the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics.iter().any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics.iter().filter(|d| d.is_error()).map(|d| &d.summary).collect::<Vec<_>>()
    );
}
