//! The GraalSystems provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::GraalClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::logging::try_init_logging;
use crate::plan;
use crate::resources::{self, handlers, state_id, Api, ResourceHandler};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// The provider: every `graalsystems_*` resource and data source over one
/// REST client.
///
/// Operations that reach the API fail with
/// [`ProviderError::Configuration`] until [`ProviderService::configure`]
/// succeeds.
pub struct GraalSystemsProvider {
    client: Arc<dyn GraalClient>,
    config: RwLock<Option<ProviderConfig>>,
    resources: BTreeMap<String, Box<dyn ResourceHandler>>,
}

impl GraalSystemsProvider {
    /// Create an unconfigured provider over a client.
    pub fn new(client: Arc<dyn GraalClient>) -> Self {
        Self {
            client,
            config: RwLock::new(None),
            resources: handlers(),
        }
    }

    /// The active configuration, if `configure` succeeded.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.config.read().await.clone()
    }

    fn handler(&self, type_name: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.resources
            .get(type_name)
            .map(|handler| &**handler)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    async fn tenant(&self) -> Result<String, ProviderError> {
        match self.config.read().await.as_ref() {
            Some(config) => Ok(config.tenant.clone()),
            None => Err(ProviderError::Configuration(
                "the provider is not configured".to_string(),
            )),
        }
    }
}

/// Data sources are looked up by exactly one of their id or name attribute.
fn lookup_diagnostics(handler: &dyn ResourceHandler, config: &Value) -> Vec<Diagnostic> {
    let id_attribute = handler.kind().id_attribute();
    let name_attribute = handler.name_attribute();
    let set = |key: &str| {
        config
            .get(key)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    };

    match (set(id_attribute.as_str()), set(name_attribute)) {
        (true, true) => vec![Diagnostic::error(format!(
            "only one of {} or {} can be set",
            id_attribute, name_attribute
        ))
        .with_attribute(id_attribute)],
        (false, false) => vec![Diagnostic::error(format!(
            "one of {} or {} must be set",
            id_attribute, name_attribute
        ))],
        _ => Vec::new(),
    }
}

#[async_trait]
impl ProviderService for GraalSystemsProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, (name, handler)| {
                schema
                    .with_resource(name.clone(), handler.schema())
                    .with_data_source(name.clone(), handler.data_source_schema())
            },
        )
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(ProviderConfig::from_value(&config)?.validate());
        }
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "provider configuration has errors");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let parsed = ProviderConfig::from_value(&config)?;
        let diagnostics = parsed.validate();
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "configure completed with errors");
            return Ok(diagnostics);
        }

        try_init_logging(parsed.log_level());
        info!(
            tenant = %parsed.tenant,
            api_url = %parsed.api_url,
            auth_mode = ?parsed.auth_mode,
            "provider configured"
        );
        *self.config.write().await = Some(parsed);
        Ok(diagnostics)
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        self.config.write().await.take();
        info!("provider stopped");
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.handler(resource_type)?;
        let mut diagnostics = validate(&handler.schema(), &config);
        if !has_errors(&diagnostics) {
            let defaulted = plan::apply_defaults(&handler.schema().block, &config);
            if let Err(errors) = handler.check_blocks(&defaulted) {
                for (block, err) in &errors {
                    diagnostics.extend(err.to_diagnostics(block));
                }
            }
        }

        if has_errors(&diagnostics) {
            warn!(resource_type = %resource_type, diagnostics = diagnostics.len(), "resource configuration has errors");
        } else {
            debug!(resource_type = %resource_type, "resource configuration is valid");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.handler(resource_type)?;
        let schema = handler.schema();
        if !proposed_state.is_null() {
            handler.check(&plan::apply_defaults(&schema.block, &proposed_state))?;
        }

        let result = plan::plan(&schema, prior_state.as_ref(), &proposed_state);
        info!(
            resource_type = %resource_type,
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "plan completed"
        );
        Ok(result)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        let tenant = self.tenant().await?;
        let api = Api {
            client: self.client.as_ref(),
            tenant: &tenant,
        };

        match resources::create(handler, api, &planned_state).await {
            Ok(state) => {
                info!(resource_type = %resource_type, "create completed");
                Ok(state)
            },
            Err(e) => {
                error!(resource_type = %resource_type, error = %e, "create failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        let tenant = self.tenant().await?;
        let api = Api {
            client: self.client.as_ref(),
            tenant: &tenant,
        };
        let id = state_id(&current_state)?;

        let state = resources::read(handler, api, id).await?;
        debug!(resource_type = %resource_type, id = %id, gone = state.is_null(), "read completed");
        Ok(state)
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.handler(resource_type)?;
        let tenant = self.tenant().await?;
        let api = Api {
            client: self.client.as_ref(),
            tenant: &tenant,
        };

        match resources::update(handler, api, &prior_state, &planned_state).await {
            Ok(state) => {
                info!(resource_type = %resource_type, "update completed");
                Ok(state)
            },
            Err(e) => {
                error!(resource_type = %resource_type, error = %e, "update failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let handler = self.handler(resource_type)?;
        let tenant = self.tenant().await?;
        let api = Api {
            client: self.client.as_ref(),
            tenant: &tenant,
        };

        resources::delete(handler, api, &current_state).await?;
        info!(resource_type = %resource_type, "delete completed");
        Ok(())
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        self.handler(resource_type)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ProviderError::InvalidRequest("import id must not be empty".to_string()));
        }
        info!(resource_type = %resource_type, id = %id, "import completed");
        Ok(vec![ImportedResource::new(resource_type, json!({ "id": id }))])
    }

    #[instrument(skip(self, config), name = "provider.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.handler(data_source_type)?;
        let mut diagnostics = validate(&handler.data_source_schema(), &config);
        diagnostics.extend(lookup_diagnostics(handler, &config));
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let handler = self.handler(data_source_type)?;
        let tenant = self.tenant().await?;
        let api = Api {
            client: self.client.as_ref(),
            tenant: &tenant,
        };

        let state = resources::lookup(handler, api, &config).await?;
        debug!(data_source_type = %data_source_type, "data source read");
        Ok(state)
    }
}
