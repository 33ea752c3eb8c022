//! Libraries attached to a job run.

use serde::{Deserialize, Serialize};

use crate::variant::{Variant, VariantSpec};

/// A library made available to a job.
///
/// The discriminator defaults to `file` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Library {
    /// A file previously uploaded to the platform.
    File(FileLibrary),
    /// A git repository checkout.
    Git(GitLibrary),
    /// A Maven artifact.
    Maven(MavenLibrary),
    /// A PyPI package.
    Pypi(PypiLibrary),
    /// A CRAN package.
    Cran(CranLibrary),
}

/// An uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLibrary {
    /// Key of the uploaded file.
    pub key: String,
}

/// A git checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLibrary {
    /// Repository URL.
    pub url: String,
    /// Path inside the repository.
    pub path: String,
    /// Branch, tag or commit.
    pub revision: String,
    /// Username for private repositories.
    pub username: String,
    /// Password or token for private repositories.
    pub password: String,
}

/// A Maven artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MavenLibrary {
    /// Repository URL.
    pub repo: String,
    /// Artifact coordinates.
    pub dependency: String,
}

/// A PyPI package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PypiLibrary {
    /// Requirement specifier.
    pub dep: String,
}

/// A CRAN package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CranLibrary {
    /// Package reference.
    #[serde(rename = "ref")]
    pub reference: String,
}

impl Variant for Library {
    const ENTITY: &'static str = "library";
    const DEFAULT: Option<&'static str> = Some("file");
    const SPECS: &'static [VariantSpec] = &[
        VariantSpec {
            name: "file",
            required: &["key"],
            forbidden: &[
                "url", "path", "revision", "username", "password", "repo", "dependency", "dep",
                "ref",
            ],
        },
        VariantSpec {
            name: "git",
            required: &["url", "path", "revision"],
            forbidden: &["key", "repo", "dependency", "dep", "ref"],
        },
        VariantSpec {
            name: "maven",
            required: &["repo", "dependency"],
            forbidden: &[
                "key", "url", "path", "revision", "username", "password", "dep", "ref",
            ],
        },
        VariantSpec {
            name: "pypi",
            required: &["dep"],
            forbidden: &[
                "key", "url", "path", "revision", "username", "password", "repo", "dependency",
                "ref",
            ],
        },
        VariantSpec {
            name: "cran",
            required: &["ref"],
            forbidden: &[
                "key", "url", "path", "revision", "username", "password", "repo", "dependency",
                "dep",
            ],
        },
    ];

    fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Git(_) => "git",
            Self::Maven(_) => "maven",
            Self::Pypi(_) => "pypi",
            Self::Cran(_) => "cran",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::variant::{flatten, read_back_all, resolve, resolve_all};
    use serde_json::{json, Value};

    #[test]
    fn test_defaults_to_file_and_requires_key() {
        let err = resolve::<Library>(&json!({})).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingField {
                entity: "library",
                variant: "file".to_string(),
                field: "key".to_string(),
            }
        );

        let library: Library = resolve(&json!({"key": "lib-123"})).unwrap();
        assert_eq!(
            library,
            Library::File(FileLibrary {
                key: "lib-123".to_string()
            })
        );
    }

    #[test]
    fn test_each_variant_resolves() {
        let libraries: Vec<Library> = resolve_all(&[
            json!({"type": "git", "url": "https://git.example.com/r.git", "path": "src", "revision": "main"}),
            json!({"type": "maven", "repo": "https://repo1.maven.org", "dependency": "org.x:y:1.0"}),
            json!({"type": "pypi", "dep": "pandas==2.2"}),
            json!({"type": "cran", "ref": "dplyr"}),
        ])
        .unwrap();
        let kinds: Vec<_> = libraries.iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec!["git", "maven", "pypi", "cran"]);
        assert_eq!(
            libraries[3],
            Library::Cran(CranLibrary {
                reference: "dplyr".to_string()
            })
        );
    }

    #[test]
    fn test_git_credentials_are_optional() {
        let library: Library = resolve(&json!({
            "type": "git",
            "url": "https://git.example.com/r.git",
            "path": "lib",
            "revision": "v1",
            "username": "bot",
            "password": "s3cret"
        }))
        .unwrap();
        match library {
            Library::Git(git) => assert_eq!(git.username, "bot"),
            other => panic!("expected git library, got {:?}", other),
        }
    }

    #[test]
    fn test_pypi_rejects_file_key() {
        let err = resolve::<Library>(&json!({"type": "pypi", "dep": "requests", "key": "k"})).unwrap_err();
        assert!(matches!(err, ResolveError::ForbiddenField { ref field, .. } if field == "key"));
    }

    #[test]
    fn test_unknown_library_type() {
        let err = resolve::<Library>(&json!({"type": "npm", "dep": "left-pad"})).unwrap_err();
        match err {
            ResolveError::InvalidVariant { allowed, .. } => {
                assert_eq!(allowed, vec!["file", "git", "maven", "pypi", "cran"])
            },
            other => panic!("expected InvalidVariant, got {:?}", other),
        }
    }

    #[test]
    fn test_cran_flattens_with_ref_key() {
        let flat = flatten(&Library::Cran(CranLibrary {
            reference: "ggplot2".to_string(),
        }))
        .unwrap();
        assert_eq!(
            Value::Object(flat[0].clone()),
            json!({"type": "cran", "ref": "ggplot2"})
        );
    }

    #[test]
    fn test_read_back_library_list() {
        let flat = read_back_all::<Library>(&json!([
            {"type": "file", "key": "a"},
            {"type": "pypi", "dep": "numpy"}
        ]))
        .unwrap();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0]["key"], "a");
        assert_eq!(flat[1]["dep"], "numpy");
    }
}
