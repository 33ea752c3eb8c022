//! Error types for the GraalSystems provider.
//!
//! [`ResolveError`] covers local failures while resolving polymorphic
//! configuration blocks (job options, schedules, libraries, workflow tasks).
//! [`ProviderError`] is what every provider operation and the REST client
//! return; resolution failures are wrapped in [`ProviderError::Resolve`].

use std::fmt;

use thiserror::Error;

use crate::schema::Diagnostic;

/// Why a task sequence was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyReason {
    /// The first task of a sequence declared dependencies.
    FirstTask,
    /// The dependency does not name any earlier task.
    Undefined,
}

impl fmt::Display for DependencyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstTask => f.write_str("the first task must not declare dependencies"),
            Self::Undefined => f.write_str("the dependency is not defined by an earlier task"),
        }
    }
}

/// Errors raised while resolving a discriminated configuration block.
///
/// All of these are local validation failures: they are reported before any
/// call to the remote API and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The discriminator is absent (and the entity has no default) or is not
    /// one of the entity's known variants.
    #[error("{entity} type must be one of {allowed:?}, got: {}", .value.as_deref().unwrap_or("<none>"))]
    InvalidVariant {
        /// The polymorphic entity (`options`, `schedule`, ...).
        entity: &'static str,
        /// The offending discriminator, if any was supplied.
        value: Option<String>,
        /// The accepted discriminator values.
        allowed: Vec<&'static str>,
    },

    /// A field required by the resolved variant is absent or empty.
    #[error("{field} is required for {entity} type {variant}")]
    MissingField {
        /// The polymorphic entity.
        entity: &'static str,
        /// The resolved variant.
        variant: String,
        /// The missing field.
        field: String,
    },

    /// A field that the resolved variant does not accept is populated.
    #[error("{field} is not allowed for {entity} type {variant}")]
    ForbiddenField {
        /// The polymorphic entity.
        entity: &'static str,
        /// The resolved variant.
        variant: String,
        /// The forbidden field.
        field: String,
    },

    /// A task sequence references a task it may not depend on.
    #[error("task {task:?} depends on {dependency:?}: {reason}")]
    DependencyError {
        /// The task declaring the dependency.
        task: String,
        /// The dependency name.
        dependency: String,
        /// What is wrong with it.
        reason: DependencyReason,
    },

    /// A wire object carries a discriminator this crate cannot decode.
    #[error("{entity} type {value} is not yet supported")]
    UnsupportedVariant {
        /// The polymorphic entity.
        entity: &'static str,
        /// The unknown discriminator (empty when none was present).
        value: String,
    },

    /// A field holds a value of the wrong shape for the resolved variant.
    #[error("invalid {entity} of type {variant}: {message}")]
    Malformed {
        /// The polymorphic entity.
        entity: &'static str,
        /// The resolved variant.
        variant: String,
        /// The decoder message.
        message: String,
    },

    /// A field is well-typed but its value is rejected.
    #[error("{field} of {entity} type {variant} is invalid: {reason}")]
    InvalidValue {
        /// The polymorphic entity.
        entity: &'static str,
        /// The resolved variant.
        variant: String,
        /// The rejected field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Several violations found on the same block.
    #[error("{}", join_messages(.0))]
    Multiple(Vec<ResolveError>),
}

impl ResolveError {
    /// Collapse a list of violations into one error.
    ///
    /// Returns `None` for an empty list and the sole element for a
    /// single-item list.
    pub fn collect(mut errors: Vec<ResolveError>) -> Option<ResolveError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Iterate over the individual violations, flattening [`ResolveError::Multiple`].
    pub fn violations(&self) -> Vec<&ResolveError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.violations()).collect(),
            other => vec![other],
        }
    }

    /// Turn each violation into an error diagnostic.
    pub fn to_diagnostics(&self, attribute: &str) -> Vec<Diagnostic> {
        self.violations()
            .into_iter()
            .map(|e| Diagnostic::error(e.to_string()).with_attribute(attribute))
            .collect()
    }
}

fn join_messages(errors: &[ResolveError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur in provider operations or REST calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A polymorphic block could not be resolved.
    #[error("Invalid configuration: {0}")]
    Resolve(#[from] ResolveError),

    /// An internal error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Map an HTTP status returned by the GraalSystems API to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::InvalidRequest(message),
            401 | 403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            409 => Self::AlreadyExists(message),
            412 => Self::FailedPrecondition(message),
            429 => Self::ResourceExhausted(message),
            501 => Self::Unimplemented(message),
            502..=503 => Self::Unavailable(message),
            504 => Self::DeadlineExceeded(message),
            _ => Self::Sdk(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Whether the remote object does not exist (anymore).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
