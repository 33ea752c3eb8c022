//! Discriminated-variant resolution.
//!
//! Polymorphic configuration blocks (job options, schedules, libraries,
//! workflow tasks) arrive as loosely-typed JSON objects whose `type` field
//! selects the concrete shape. Resolution happens in three steps:
//!
//! 1. **Dispatch**: read the discriminator, apply the entity default when it
//!    is absent, and reject values outside the entity's fixed set.
//! 2. **Validation**: check the variant's required and forbidden field tables.
//!    Every violation is collected before failing.
//! 3. **Projection**: keep the non-null entries, insert the discriminator and
//!    decode the object tree straight into the typed shape. Unknown fields are
//!    ignored and absent fields take their zero value.
//!
//! The reverse direction ([`flatten`], [`read_back`]) turns a typed or wire
//! value into the single-element list of maps the configuration layer stores.
//!
//! # Example
//!
//! ```
//! use graalsystems_provider::variant::{resolve, Variant};
//! use graalsystems_provider::variants::Schedule;
//! use serde_json::json;
//!
//! let schedule: Schedule = resolve(&json!({
//!     "type": "cron",
//!     "cron_expression": "0 0 * * *",
//!     "timezone": "UTC",
//!     "infrastructure_id": "infra-1"
//! }))
//! .unwrap();
//! assert_eq!(schedule.kind(), "cron");
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ResolveError;

/// A flattened configuration block.
pub type ConfigMap = Map<String, Value>;

/// The field that selects a variant.
pub const DISCRIMINATOR: &str = "type";

/// Field requirements of one concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSpec {
    /// Discriminator value selecting this variant.
    pub name: &'static str,
    /// Fields that must be present and non-empty.
    pub required: &'static [&'static str],
    /// Fields that must be absent or empty.
    pub forbidden: &'static [&'static str],
}

/// A tagged union resolvable from configuration.
///
/// Implementors are serde enums tagged on [`DISCRIMINATOR`] whose variant
/// names match the `name` of an entry in [`Variant::SPECS`].
pub trait Variant: Serialize + DeserializeOwned {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Variant used when the discriminator is absent.
    const DEFAULT: Option<&'static str> = None;

    /// Field tables, one per known variant.
    const SPECS: &'static [VariantSpec];

    /// The discriminator value of this instance.
    fn kind(&self) -> &'static str;

    /// Value checks that only make sense on the decoded shape.
    fn check(&self) -> Vec<ResolveError> {
        Vec::new()
    }

    /// Names of all known variants, in table order.
    fn allowed() -> Vec<&'static str> {
        Self::SPECS.iter().map(|s| s.name).collect()
    }

    /// Look up the field table of a variant.
    fn spec(kind: &str) -> Option<&'static VariantSpec> {
        Self::SPECS.iter().find(|s| s.name == kind)
    }
}

/// Whether a configuration value counts as "not set".
///
/// The configuration layer reports unset attributes as zero values, so
/// empty strings, lists and maps are treated like absent ones.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Select the variant table for a configuration object.
pub fn dispatch<V: Variant>(config: &ConfigMap) -> Result<&'static VariantSpec, ResolveError> {
    let invalid = |value: Option<String>| ResolveError::InvalidVariant {
        entity: V::ENTITY,
        value,
        allowed: V::allowed(),
    };

    let kind = match config.get(DISCRIMINATOR) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => return Err(invalid(Some(other.to_string()))),
    };

    let kind = match kind.or(V::DEFAULT) {
        Some(kind) => kind,
        None => return Err(invalid(None)),
    };

    V::spec(kind).ok_or_else(|| invalid(Some(kind.to_string())))
}

/// Check a configuration object against a variant's field tables.
///
/// Returns every violation, required fields first.
pub fn check_fields(entity: &'static str, spec: &VariantSpec, config: &ConfigMap) -> Vec<ResolveError> {
    let missing = spec
        .required
        .iter()
        .filter(|field| is_empty(config.get(**field)))
        .map(|field| ResolveError::MissingField {
            entity,
            variant: spec.name.to_string(),
            field: field.to_string(),
        });

    let forbidden = spec
        .forbidden
        .iter()
        .filter(|field| !is_empty(config.get(**field)))
        .map(|field| ResolveError::ForbiddenField {
            entity,
            variant: spec.name.to_string(),
            field: field.to_string(),
        });

    missing.chain(forbidden).collect()
}

/// Resolve a configuration block into its concrete variant.
///
/// The input must be a JSON object. See the module documentation for the
/// exact steps.
pub fn resolve<V: Variant>(config: &Value) -> Result<V, ResolveError> {
    let map = config.as_object().ok_or_else(|| ResolveError::InvalidVariant {
        entity: V::ENTITY,
        value: None,
        allowed: V::allowed(),
    })?;

    let spec = dispatch::<V>(map)?;
    if let Some(err) = ResolveError::collect(check_fields(V::ENTITY, spec, map)) {
        return Err(err);
    }

    let value: V = decode(spec.name, project(map, spec.name))?;
    match ResolveError::collect(value.check()) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Resolve a list of configuration blocks, failing on the first bad block.
pub fn resolve_all<V: Variant>(configs: &[Value]) -> Result<Vec<V>, ResolveError> {
    configs.iter().map(resolve::<V>).collect()
}

/// Flatten a typed variant into the stored configuration shape.
///
/// The result is a single-element list holding a map whose keys are the
/// variant's field names plus the discriminator.
pub fn flatten<V: Variant>(value: &V) -> Result<Vec<ConfigMap>, ResolveError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(vec![map]),
        Ok(other) => Err(ResolveError::Malformed {
            entity: V::ENTITY,
            variant: value.kind().to_string(),
            message: format!("expected an object, got {}", other),
        }),
        Err(e) => Err(ResolveError::Malformed {
            entity: V::ENTITY,
            variant: value.kind().to_string(),
            message: e.to_string(),
        }),
    }
}

/// Reverse-convert a polymorphic object returned by the API.
///
/// `null` flattens to an empty list. A missing or unknown discriminator is
/// an [`ResolveError::UnsupportedVariant`]: an unknown shape cannot be
/// stored and read back faithfully.
pub fn read_back<V: Variant>(wire: &Value) -> Result<Vec<ConfigMap>, ResolveError> {
    let map = match wire {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(ResolveError::UnsupportedVariant {
                entity: V::ENTITY,
                value: other.to_string(),
            })
        },
    };

    let kind = map
        .get(DISCRIMINATOR)
        .and_then(Value::as_str)
        .unwrap_or_default();
    let spec = V::spec(kind).ok_or_else(|| ResolveError::UnsupportedVariant {
        entity: V::ENTITY,
        value: kind.to_string(),
    })?;

    let value: V = decode(spec.name, project(map, spec.name))?;
    flatten(&value)
}

/// Reverse-convert a list of polymorphic objects into one flat list.
pub fn read_back_all<V: Variant>(wire: &Value) -> Result<Vec<ConfigMap>, ResolveError> {
    match wire {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.extend(read_back::<V>(item)?);
            }
            Ok(out)
        },
        single => read_back::<V>(single),
    }
}

fn project(map: &ConfigMap, kind: &str) -> Value {
    let mut projected: ConfigMap = map
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    projected.insert(DISCRIMINATOR.to_string(), Value::String(kind.to_string()));
    Value::Object(projected)
}

fn decode<V: Variant>(kind: &str, value: Value) -> Result<V, ResolveError> {
    serde_json::from_value(value).map_err(|e| ResolveError::Malformed {
        entity: V::ENTITY,
        variant: kind.to_string(),
        message: e.to_string(),
    })
}
