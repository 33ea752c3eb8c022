//! GraalSystems infrastructure provider
//!
//! This crate manages GraalSystems platform objects (projects, identities,
//! groups, users, workspaces, jobs and workflows) as declarative resources,
//! and exposes each of them as a data source as well.
//!
//! # Overview
//!
//! - **Variant resolution** ([`variant`], [`variants`]): polymorphic
//!   configuration blocks (job options, schedules, libraries, workflow tasks)
//!   are checked against per-variant field tables and decoded into typed
//!   enums before any remote call.
//! - **Schemas** ([`schema`], [`validation`]): resource schemas and the
//!   diagnostics produced when a configuration does not match them.
//! - **Planning** ([`plan`]): schema-driven diffs with zero-value semantics
//!   and `force_new` replacement.
//! - **Resources** ([`resources`]): one [`resources::ResourceHandler`] per
//!   object kind over a shared create, read, update, delete and lookup flow.
//! - **Provider** ([`GraalSystemsProvider`]): the [`ProviderService`]
//!   operations, over any [`client::GraalClient`].
//! - **Logging** ([`logging`]): `tracing` output on stderr.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use graalsystems_provider::testing::InMemoryClient;
//! use graalsystems_provider::{GraalSystemsProvider, ProviderService};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let provider = GraalSystemsProvider::new(Arc::new(InMemoryClient::new()));
//! provider.configure(InMemoryClient::provider_config()).await.unwrap();
//!
//! let diagnostics = provider
//!     .validate_resource_config(
//!         "graalsystems_job",
//!         json!({
//!             "name": "nightly",
//!             "project_id": "p-1",
//!             "identity_id": "i-1",
//!             "options": [{
//!                 "type": "bash",
//!                 "module": "etl.main",
//!                 "docker_image": "alpine",
//!                 "instance_type": "small"
//!             }]
//!         }),
//!     )
//!     .await
//!     .unwrap();
//! // bash options need `lines` and refuse `module`
//! assert_eq!(diagnostics.len(), 2);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;
pub mod variant;
pub mod variants;

// Re-export main types at crate root
pub use client::{GraalClient, Patch, ResourceKind};
pub use config::{AuthMode, ProviderConfig};
pub use error::{DependencyReason, ProviderError, ResolveError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::GraalSystemsProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};
pub use variant::{resolve, Variant};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
