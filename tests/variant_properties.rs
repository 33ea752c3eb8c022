//! Property-based tests for variant resolution and task ordering.

use graalsystems_provider::error::{DependencyReason, ResolveError};
use graalsystems_provider::variant::{flatten, read_back, resolve, Variant, VariantSpec};
use graalsystems_provider::variants::{validate_task_sequence, JobOptions, Library, Schedule, Task};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_bash_options() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec("[a-z][a-z0-9 ]{0,15}", 1..5),
        "[a-z]{1,8}:[0-9]{1,2}\\.[0-9]",
        "(xs|small|medium|large)",
        prop::collection::btree_map("[A-Z]{1,6}", "[a-z0-9]{0,6}", 0..3),
    )
        .prop_map(|(lines, image, instance, env)| {
            json!({
                "type": "bash",
                "lines": lines,
                "docker_image": image,
                "instance_type": instance,
                "env": env
            })
        })
}

fn arb_library() -> impl Strategy<Value = Value> {
    let word = "[a-z][a-z0-9-]{0,11}";
    prop_oneof![
        word.prop_map(|key| json!({"key": key})),
        word.prop_map(|dep| json!({"type": "pypi", "dep": dep})),
        word.prop_map(|reference| json!({"type": "cran", "ref": reference})),
        (word, word).prop_map(|(repo, dependency)| json!({
            "type": "maven",
            "repo": format!("https://{}.test", repo),
            "dependency": dependency
        })),
        (word, word, word).prop_map(|(url, path, revision)| json!({
            "type": "git",
            "url": format!("https://{}.test", url),
            "path": path,
            "revision": revision
        })),
    ]
}

fn arb_python_options() -> impl Strategy<Value = Value> {
    (
        "[a-z]{1,8}(\\.[a-z]{1,8}){0,2}",
        "[a-z]{1,8}:[0-9]{1,2}\\.[0-9]",
        "(xs|small|medium|large)",
        prop::collection::btree_map("[A-Z]{1,6}", "[a-z0-9]{0,6}", 0..3),
    )
        .prop_map(|(module, image, instance, env)| {
            json!({
                "type": "python",
                "module": module,
                "docker_image": image,
                "instance_type": instance,
                "env": env
            })
        })
}

fn arb_schedule() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({"type": "once"})),
        (
            "[0-9*]{1,2} [0-9*]{1,2} \\* \\* \\*",
            "(UTC|Europe/Paris|America/New_York)",
            "infra-[0-9]{1,3}",
            prop::option::of("dev-[0-9]{1,3}"),
        )
            .prop_map(|(cron, timezone, infrastructure, device)| {
                let mut schedule = json!({
                    "type": "cron",
                    "cron_expression": cron,
                    "timezone": timezone,
                    "infrastructure_id": infrastructure
                });
                if let Some(device) = device {
                    schedule["device_id"] = json!(device);
                }
                schedule
            }),
    ]
}

fn arb_task() -> impl Strategy<Value = Value> {
    (
        "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}",
        "[a-z][a-z0-9_]{0,10}",
        prop::collection::vec("[a-z][a-z0-9_]{0,10}", 0..3),
    )
        .prop_map(|(reference, name, depends_on)| {
            json!({"type": "job", "ref": reference, "name": name, "depends_on": depends_on})
        })
}

/// Reading back what a resolved block serializes to gives its flattened state.
fn check_read_back<V: Variant>(config: &Value) -> Result<(), TestCaseError> {
    let resolved: V = resolve(config).map_err(|e| TestCaseError::fail(e.to_string()))?;
    let wire = serde_json::to_value(&resolved).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert_eq!(read_back::<V>(&wire).unwrap(), flatten(&resolved).unwrap());
    Ok(())
}

/// Sequences where every dependency points at an earlier task.
fn arb_ordered_tasks() -> impl Strategy<Value = Vec<Value>> {
    (1usize..8).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..3), n).prop_map(
            |deps| {
                deps.iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let depends_on: Vec<String> = if i == 0 {
                            Vec::new()
                        } else {
                            picks.iter().map(|p| format!("t{}", p.index(i))).collect()
                        };
                        json!({"name": format!("t{}", i), "depends_on": depends_on})
                    })
                    .collect()
            },
        )
    })
}

proptest! {
    #[test]
    fn test_resolve_flatten_round_trip(config in arb_bash_options()) {
        let resolved: JobOptions = resolve(&config).unwrap();
        let flat = flatten(&resolved).unwrap();
        prop_assert_eq!(flat.len(), 1);

        let again: JobOptions = resolve(&Value::Object(flat[0].clone())).unwrap();
        prop_assert_eq!(again, resolved);
    }

    #[test]
    fn test_read_back_matches_flatten(config in arb_library()) {
        check_read_back::<Library>(&config)?;
    }

    #[test]
    fn test_options_read_back_matches_flatten(
        config in prop_oneof![arb_bash_options(), arb_python_options()]
    ) {
        check_read_back::<JobOptions>(&config)?;
    }

    #[test]
    fn test_schedule_read_back_matches_flatten(config in arb_schedule()) {
        check_read_back::<Schedule>(&config)?;
    }

    #[test]
    fn test_task_read_back_matches_flatten(config in arb_task()) {
        check_read_back::<Task>(&config)?;
    }

    #[test]
    fn test_python_resolve_flatten_round_trip(config in arb_python_options()) {
        let resolved: JobOptions = resolve(&config).unwrap();
        let flat = flatten(&resolved).unwrap();
        let again: JobOptions = resolve(&Value::Object(flat[0].clone())).unwrap();
        prop_assert_eq!(again, resolved);
    }

    #[test]
    fn test_unknown_discriminator_is_rejected(
        kind in "[a-z]{1,10}".prop_filter("unknown kind", |k| k != "bash" && k != "python")
    ) {
        let err = resolve::<JobOptions>(&json!({"type": kind.clone(), "lines": ["make"]})).unwrap_err();
        prop_assert_eq!(
            err,
            ResolveError::InvalidVariant {
                entity: "options",
                value: Some(kind),
                allowed: JobOptions::allowed(),
            }
        );
    }

    #[test]
    fn test_every_missing_cron_field_is_reported(present in prop::collection::vec(any::<bool>(), 3)) {
        let fields = ["cron_expression", "timezone", "infrastructure_id"];
        let mut config = json!({"type": "cron"});
        for (field, keep) in fields.iter().zip(&present) {
            if *keep {
                config[*field] = json!("set");
            }
        }

        let missing = present.iter().filter(|keep| !**keep).count();
        match resolve::<Schedule>(&config) {
            Ok(schedule) => {
                prop_assert_eq!(missing, 0);
                prop_assert_eq!(schedule.kind(), "cron");
            },
            Err(err) => {
                prop_assert_eq!(err.violations().len(), missing);
                let all_missing = err
                    .violations()
                    .iter()
                    .all(|v| matches!(v, ResolveError::MissingField { .. }));
                prop_assert!(all_missing);
            },
        }
    }

    #[test]
    fn test_backward_dependencies_are_accepted(tasks in arb_ordered_tasks()) {
        prop_assert!(validate_task_sequence(&tasks).is_ok());
    }

    #[test]
    fn test_self_dependency_is_rejected(
        (mut tasks, position) in arb_ordered_tasks()
            .prop_flat_map(|tasks| {
                let n = tasks.len();
                (Just(tasks), 0..n)
            })
    ) {
        let name = format!("t{}", position);
        tasks[position]["depends_on"] = json!([name.clone()]);

        let expected = if position == 0 {
            DependencyReason::FirstTask
        } else {
            DependencyReason::Undefined
        };
        let err = validate_task_sequence(&tasks).unwrap_err();
        let is_expected = matches!(
            err,
            ResolveError::DependencyError { ref dependency, reason, .. }
                if *dependency == name && reason == expected
        );
        prop_assert!(is_expected);
    }
}

#[test]
fn test_task_sequence_examples() {
    assert!(validate_task_sequence(&[
        json!({"name": "a", "depends_on": []}),
        json!({"name": "b", "depends_on": ["a"]}),
    ])
    .is_ok());

    let err = validate_task_sequence(&[json!({"name": "a", "depends_on": ["x"]})]).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::DependencyError {
            reason: DependencyReason::FirstTask,
            ..
        }
    ));

    let err = validate_task_sequence(&[
        json!({"name": "a", "depends_on": []}),
        json!({"name": "b", "depends_on": ["c"]}),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::DependencyError {
            reason: DependencyReason::Undefined,
            ..
        }
    ));
}

fn sample(field: &str) -> Value {
    match field {
        "lines" => json!(["echo hi"]),
        "ref" => json!("2f1c4a5e-8a61-4b8e-9d0c-6a2b1f3e7d10"),
        _ => json!("x"),
    }
}

fn filled(spec: &VariantSpec) -> Value {
    let mut config = json!({"type": spec.name});
    for field in spec.required {
        config[*field] = sample(field);
    }
    config
}

fn check_every_variant<V: Variant + std::fmt::Debug>() {
    for spec in V::SPECS {
        let resolved: V = resolve(&filled(spec)).unwrap();
        assert_eq!(resolved.kind(), spec.name);
        let wire = serde_json::to_value(&resolved).unwrap();
        assert_eq!(wire["type"], spec.name);

        for field in spec.forbidden {
            let mut config = filled(spec);
            config[*field] = sample(field);
            let err = resolve::<V>(&config).unwrap_err();
            assert!(
                matches!(err, ResolveError::ForbiddenField { field: ref f, .. } if f == field),
                "{} {}: {}",
                spec.name,
                field,
                err
            );
        }
    }
}

#[test]
fn test_required_fields_resolve_and_forbidden_fields_fail() {
    check_every_variant::<JobOptions>();
    check_every_variant::<Schedule>();
    check_every_variant::<Library>();
    check_every_variant::<Task>();
}
