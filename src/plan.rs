//! Schema-driven planning.
//!
//! A plan compares the prior state with the proposed configuration, one
//! top-level attribute or block at a time. Unset values compare equal to
//! their zero value (`null`, `""`, `0`, `false`, `[]`, `{}`), the same way the
//! configuration layer reports them, so a value read back from the API never
//! shows up as a spurious change.

use serde_json::{Map, Value};

use crate::schema::{Block, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Fill schema defaults into every unset attribute, nested blocks included.
pub fn apply_defaults(block: &Block, value: &Value) -> Value {
    let map = match value {
        Value::Object(map) => map,
        other => return other.clone(),
    };

    let mut out = map.clone();
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            if is_zero(out.get(name)) {
                out.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        let applied = match (nested.nesting_mode, out.get(name)) {
            (BlockNestingMode::List, Some(Value::Array(items))) => Value::Array(
                items
                    .iter()
                    .map(|item| apply_defaults(&nested.block, item))
                    .collect(),
            ),
            (BlockNestingMode::Single, Some(item @ Value::Object(_))) => apply_defaults(&nested.block, item),
            _ => continue,
        };
        out.insert(name.clone(), applied);
    }

    Value::Object(out)
}

/// Whether a value is unset or holds its zero value.
pub fn is_zero(value: Option<&Value>) -> bool {
    normalize(value).is_null()
}

/// Compare two values under zero-value semantics.
pub fn same(a: Option<&Value>, b: Option<&Value>) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::Bool(false)) => Value::Null,
        Some(Value::String(s)) if s.is_empty() => Value::Null,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Value::Null,
        Some(Value::Array(items)) if items.is_empty() => Value::Null,
        Some(Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| match normalize(Some(item)) {
                    // keep positions stable inside lists
                    Value::Null => Value::Object(Map::new()),
                    other => other,
                })
                .collect(),
        ),
        Some(Value::Object(map)) => {
            let kept: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), normalize(Some(v))))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if kept.is_empty() {
                Value::Null
            } else {
                Value::Object(kept)
            }
        },
        Some(other) => other.clone(),
    }
}

/// Plan a resource against its schema.
///
/// A `null` proposal plans a destroy. A change to a `force_new` attribute or
/// block requires replacement; otherwise computed attributes carry over from
/// the prior state.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    if proposed.is_null() {
        let changes: Vec<AttributeChange> = prior
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter(|(_, v)| !is_zero(Some(*v)))
                    .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = apply_defaults(&schema.block, proposed);
    let block = &schema.block;

    let prior = match prior.filter(|p| !p.is_null()) {
        None => {
            let changes: Vec<AttributeChange> = configurable(block)
                .filter_map(|(name, _)| {
                    let value = planned.get(name).filter(|v| !is_zero(Some(*v)))?;
                    Some(AttributeChange::added(name.clone(), value.clone()))
                })
                .collect();
            return PlanResult::with_changes(planned, changes, false);
        },
        Some(prior) => prior,
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for (name, force_new) in configurable(block) {
        let before = prior.get(name);
        let after = planned.get(name);
        if !same(before, after) {
            changes.push(AttributeChange::modified(
                name.clone(),
                before.cloned().unwrap_or(Value::Null),
                after.cloned().unwrap_or(Value::Null),
            ));
            requires_replace |= force_new;
        }
    }

    if let Value::Object(map) = &mut planned {
        for (name, attr) in &block.attributes {
            if !attr.flags.computed {
                continue;
            }
            let computed_only = attr.flags.is_computed_only();
            if requires_replace && computed_only {
                map.remove(name);
            } else if !requires_replace && (computed_only || is_zero(map.get(name))) {
                if let Some(value) = prior.get(name) {
                    map.insert(name.clone(), value.clone());
                }
            }
        }
    }

    PlanResult::with_changes(planned, changes, requires_replace)
}

/// Top-level attribute and block names the user can set, with their
/// `force_new` flag.
fn configurable(block: &Block) -> impl Iterator<Item = (&String, bool)> {
    let attributes = block
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.flags.is_computed_only())
        .map(|(name, attr)| (name, attr.force_new));
    let blocks = block.blocks.iter().map(|(name, nested)| (name, nested.force_new));
    attributes.chain(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("max_retries", Attribute::optional_int64())
            .with_attribute("project_id", Attribute::required_string().with_force_new())
            .with_block(
                "library",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("type", Attribute::optional_string().with_default(json!("file")))
                        .with_attribute("key", Attribute::optional_string()),
                )
                .with_force_new(),
            )
    }

    #[test]
    fn test_zero_values_compare_equal() {
        assert!(same(None, Some(&json!(""))));
        assert!(same(Some(&json!(0)), Some(&json!(null))));
        assert!(same(Some(&json!({"env": {}, "lines": ["a"]})), Some(&json!({"lines": ["a"]}))));
        assert!(!same(Some(&json!(["a"])), Some(&json!(["b"]))));
        assert!(!same(Some(&json!(1)), None));
    }

    #[test]
    fn test_apply_defaults_in_list_blocks() {
        let planned = apply_defaults(&schema().block, &json!({"library": [{"key": "k"}, {"type": "pypi"}]}));
        assert_eq!(planned["library"][0]["type"], "file");
        assert_eq!(planned["library"][1]["type"], "pypi");
    }

    #[test]
    fn test_plan_create() {
        let result = plan(&schema(), None, &json!({"name": "etl", "project_id": "p1", "max_retries": 0}));
        let paths: Vec<_> = result.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "project_id"]);
        assert!(!result.requires_replace);
    }

    #[test]
    fn test_plan_update_in_place_keeps_id() {
        let prior = json!({"id": "j-1", "name": "etl", "project_id": "p1", "library": [{"type": "file", "key": "k"}]});
        let result = plan(&schema(), Some(&prior), &json!({"name": "etl2", "project_id": "p1", "library": [{"key": "k"}]}));
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "name");
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["id"], "j-1");
    }

    #[test]
    fn test_plan_force_new_replaces() {
        let prior = json!({"id": "j-1", "name": "etl", "project_id": "p1"});
        let result = plan(&schema(), Some(&prior), &json!({"name": "etl", "project_id": "p2"}));
        assert!(result.requires_replace);
        assert!(result.planned_state.get("id").is_none());

        let result = plan(&schema(), Some(&prior), &json!({"name": "etl", "project_id": "p1", "library": [{"key": "k"}]}));
        assert!(result.requires_replace);
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"id": "j-1", "name": "etl", "description": ""});
        let result = plan(&schema(), Some(&prior), &Value::Null);
        assert!(result.planned_state.is_null());
        assert_eq!(result.changes.len(), 2);
    }
}
