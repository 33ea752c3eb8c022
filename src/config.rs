//! Provider configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{has_errors, Attribute, Diagnostic, Schema};

/// How the provider authenticates against the GraalSystems identity server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Resource-owner password grant with `username` and `password`.
    #[default]
    Credentials,
    /// Client-credentials grant with `application_id` and `application_secret`.
    Application,
}

impl AuthMode {
    /// All accepted mode names.
    pub const ALL: &'static [&'static str] = &["credentials", "application"];

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "" | "credentials" => Some(Self::Credentials),
            "application" => Some(Self::Application),
            _ => None,
        }
    }
}

/// Settings supplied in the provider block.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Tenant sent with every API call.
    pub tenant: String,
    /// Base URL of the GraalSystems API.
    pub api_url: String,
    /// Base URL of the identity server.
    pub auth_url: String,
    /// Authentication mode.
    pub auth_mode: AuthMode,
    /// Username, for the credentials mode.
    pub username: String,
    /// Password, for the credentials mode.
    pub password: String,
    /// Application id, for the application mode.
    pub application_id: String,
    /// Application secret, for the application mode.
    pub application_secret: String,
    /// Log at debug level.
    pub debug: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("tenant", &self.tenant)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("auth_mode", &self.auth_mode)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("application_id", &self.application_id)
            .field("application_secret", &redact(&self.application_secret))
            .field("debug", &self.debug)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl ProviderConfig {
    /// The provider block schema.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Connection settings for the GraalSystems platform")
            .with_attribute(
                "tenant",
                Attribute::required_string().with_description("The tenant ID"),
            )
            .with_attribute(
                "api_url",
                Attribute::required_string().with_description("The API URL to use"),
            )
            .with_attribute(
                "auth_url",
                Attribute::required_string().with_description("The Auth URL to use"),
            )
            .with_attribute(
                "auth_mode",
                Attribute::optional_string()
                    .with_description("The Auth mode to use")
                    .with_allowed_values(AuthMode::ALL.iter().copied())
                    .with_default(Value::String("credentials".to_string())),
            )
            .with_attribute(
                "username",
                Attribute::optional_string().with_description("The username (for credentials auth mode)"),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .with_description("The password (for credentials auth mode)")
                    .sensitive(),
            )
            .with_attribute(
                "application_id",
                Attribute::optional_string().with_description("The application id (for application auth mode)"),
            )
            .with_attribute(
                "application_secret",
                Attribute::optional_string()
                    .with_description("The application secret (for application auth mode)")
                    .sensitive(),
            )
            .with_attribute(
                "debug",
                Attribute::optional_bool().with_description("Log API calls at debug level"),
            )
    }

    /// Parse the provider block.
    ///
    /// An unknown `auth_mode` is a configuration error. Missing fields are
    /// reported by [`ProviderConfig::validate`], not here.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        let mut normalized = match config {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map.clone(),
            other => {
                return Err(ProviderError::Configuration(format!(
                    "provider configuration must be an object, got {}",
                    other
                )))
            },
        };

        // null and "" fall back to the default mode
        let mode = match normalized.remove("auth_mode") {
            None | Some(Value::Null) => AuthMode::default(),
            Some(Value::String(raw)) => AuthMode::parse(&raw).ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "auth_mode must be one of {:?}, got: {}",
                    AuthMode::ALL,
                    raw
                ))
            })?,
            Some(other) => {
                return Err(ProviderError::Configuration(format!(
                    "auth_mode must be a string, got {}",
                    other
                )))
            },
        };

        normalized.retain(|_, v| !v.is_null());
        let mut parsed: Self = serde_json::from_value(Value::Object(normalized))?;
        parsed.auth_mode = mode;
        Ok(parsed)
    }

    /// Check that every setting the selected auth mode needs is present.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut required = vec![
            ("tenant", &self.tenant),
            ("api_url", &self.api_url),
            ("auth_url", &self.auth_url),
        ];
        match self.auth_mode {
            AuthMode::Credentials => {
                required.push(("username", &self.username));
                required.push(("password", &self.password));
            },
            AuthMode::Application => {
                required.push(("application_id", &self.application_id));
                required.push(("application_secret", &self.application_secret));
            },
        }

        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| {
                Diagnostic::error(format!("Missing provider setting '{}'", name))
                    .with_detail(format!(
                        "'{}' is required when auth_mode is {:?}",
                        name, self.auth_mode
                    ))
                    .with_attribute(name)
            })
            .collect()
    }

    /// Parse and validate in one step.
    pub fn load(config: &Value) -> Result<Self, ProviderError> {
        let parsed = Self::from_value(config)?;
        let diagnostics = parsed.validate();
        if has_errors(&diagnostics) {
            let summaries: Vec<_> = diagnostics.into_iter().map(|d| d.summary).collect();
            return Err(ProviderError::Configuration(summaries.join("; ")));
        }
        Ok(parsed)
    }

    /// The OpenID Connect token endpoint of a realm.
    pub fn token_url(&self, realm: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.auth_url.trim_end_matches('/'),
            realm
        )
    }

    /// User agent sent with API calls.
    pub fn user_agent(&self, terraform_version: &str) -> String {
        format!(
            "Terraform/{} graalsystems-provider/{}",
            terraform_version,
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Default log level for this configuration.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            crate::logging::DEFAULT_LEVEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn credentials() -> Value {
        json!({
            "tenant": "acme",
            "api_url": "https://api.graal.systems",
            "auth_url": "https://auth.graal.systems/",
            "username": "ops",
            "password": "hunter2"
        })
    }

    #[test]
    fn test_parse_credentials_mode() {
        let config = ProviderConfig::load(&credentials()).unwrap();
        assert_eq!(config.auth_mode, AuthMode::Credentials);
        assert_eq!(config.tenant, "acme");
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_application_mode_needs_application_credentials() {
        let config = ProviderConfig::from_value(&json!({
            "tenant": "acme",
            "api_url": "https://api",
            "auth_url": "https://auth",
            "auth_mode": "application",
            "application_id": "app"
        }))
        .unwrap();
        let diagnostics = config.validate();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("application_secret".to_string()));
    }

    #[test]
    fn test_unknown_auth_mode() {
        let err = ProviderConfig::from_value(&json!({"auth_mode": "kerberos"})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(ref m) if m.contains("kerberos")));
    }

    #[test]
    fn test_nulls_are_unset() {
        let config = ProviderConfig::from_value(&json!({"tenant": null, "auth_mode": null, "debug": true})).unwrap();
        assert_eq!(config.tenant, "");
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.validate().len(), 5);
    }

    #[test]
    fn test_load_reports_every_missing_setting() {
        let err = ProviderConfig::load(&json!({})).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tenant"));
        assert!(message.contains("password"));
    }

    #[test]
    fn test_token_url_and_user_agent() {
        let config = ProviderConfig::load(&credentials()).unwrap();
        assert_eq!(
            config.token_url("acme"),
            "https://auth.graal.systems/realms/acme/protocol/openid-connect/token"
        );
        assert!(config.user_agent("1.9.0").starts_with("Terraform/1.9.0 graalsystems-provider/"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ProviderConfig::load(&credentials()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_schema_accepts_credentials() {
        assert!(validate(&ProviderConfig::schema(), &credentials()).is_empty());
        let diagnostics = validate(&ProviderConfig::schema(), &json!({"tenant": "t", "api_url": "a", "auth_url": "u", "auth_mode": "sso"}));
        assert_eq!(diagnostics.len(), 1);
    }
}
