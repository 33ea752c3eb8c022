//! Job execution options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::variant::{Variant, VariantSpec};

/// How a job runs: a list of shell lines or a Python module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobOptions {
    /// Run shell lines.
    Bash(BashOptions),
    /// Run a Python module.
    Python(PythonOptions),
}

/// Options of a `bash` job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BashOptions {
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Container image.
    pub docker_image: String,
    /// Compute instance type.
    pub instance_type: String,
    /// Shell lines, executed in order.
    pub lines: Vec<String>,
}

/// Options of a `python` job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonOptions {
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Container image.
    pub docker_image: String,
    /// Compute instance type.
    pub instance_type: String,
    /// Module to execute.
    pub module: String,
}

impl JobOptions {
    /// Container image, whatever the variant.
    pub fn docker_image(&self) -> &str {
        match self {
            Self::Bash(o) => &o.docker_image,
            Self::Python(o) => &o.docker_image,
        }
    }

    /// Instance type, whatever the variant.
    pub fn instance_type(&self) -> &str {
        match self {
            Self::Bash(o) => &o.instance_type,
            Self::Python(o) => &o.instance_type,
        }
    }
}

impl Variant for JobOptions {
    const ENTITY: &'static str = "options";
    const SPECS: &'static [VariantSpec] = &[
        VariantSpec {
            name: "bash",
            required: &["lines"],
            forbidden: &["module"],
        },
        VariantSpec {
            name: "python",
            required: &["module"],
            forbidden: &["lines"],
        },
    ];

    fn kind(&self) -> &'static str {
        match self {
            Self::Bash(_) => "bash",
            Self::Python(_) => "python",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::variant::{flatten, read_back, resolve};
    use serde_json::{json, Value};

    #[test]
    fn test_bash_requires_lines() {
        let err = resolve::<JobOptions>(&json!({"type": "bash"})).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingField {
                entity: "options",
                variant: "bash".to_string(),
                field: "lines".to_string(),
            }
        );

        let err = resolve::<JobOptions>(&json!({"type": "bash", "lines": []})).unwrap_err();
        assert!(matches!(err, ResolveError::MissingField { .. }));
    }

    #[test]
    fn test_bash_resolves() {
        let options: JobOptions = resolve(&json!({"type": "bash", "lines": ["echo hi"]})).unwrap();
        assert_eq!(options.kind(), "bash");
        assert_eq!(
            options,
            JobOptions::Bash(BashOptions {
                lines: vec!["echo hi".to_string()],
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_python_resolves_with_common_fields() {
        let options: JobOptions = resolve(&json!({
            "type": "python",
            "module": "etl.main",
            "docker_image": "python:3.12",
            "instance_type": "small",
            "env": {"STAGE": "prod"},
            "lines": []
        }))
        .unwrap();
        assert_eq!(options.docker_image(), "python:3.12");
        assert_eq!(options.instance_type(), "small");
        match options {
            JobOptions::Python(p) => {
                assert_eq!(p.module, "etl.main");
                assert_eq!(p.env.get("STAGE").map(String::as_str), Some("prod"));
            },
            other => panic!("expected python options, got {:?}", other),
        }
    }

    #[test]
    fn test_forbidden_cross_fields() {
        let err = resolve::<JobOptions>(&json!({
            "type": "python",
            "module": "m",
            "lines": ["echo"]
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::ForbiddenField { ref field, .. } if field == "lines"));

        let err = resolve::<JobOptions>(&json!({
            "type": "bash",
            "lines": ["echo"],
            "module": "m"
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::ForbiddenField { ref field, .. } if field == "module"));
    }

    #[test]
    fn test_type_is_required() {
        let err = resolve::<JobOptions>(&json!({"lines": ["echo"]})).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidVariant { value: None, .. }));
    }

    #[test]
    fn test_env_must_be_strings() {
        let err = resolve::<JobOptions>(&json!({
            "type": "bash",
            "lines": ["echo"],
            "env": {"N": 1}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
    }

    #[test]
    fn test_flatten_bash() {
        let options = JobOptions::Bash(BashOptions {
            lines: vec!["make".to_string()],
            docker_image: "alpine".to_string(),
            ..Default::default()
        });
        let flat = flatten(&options).unwrap();
        assert_eq!(
            Value::Object(flat[0].clone()),
            json!({
                "type": "bash",
                "env": {},
                "docker_image": "alpine",
                "instance_type": "",
                "lines": ["make"]
            })
        );
    }

    #[test]
    fn test_read_back_unknown_options() {
        let err = read_back::<JobOptions>(&json!({"type": "spark", "main_class": "X"})).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedVariant { ref value, .. } if value == "spark"));
    }
}
