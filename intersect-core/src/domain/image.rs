//! Image recipes and built images

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::credentials::RegistryCredentials;
use super::source::SourceTree;
use crate::constants::{CREATED_LABEL, GIT_SHA_BUILD_ARG, VERSION_BUILD_ARG};

/// A `--build-arg` passed to the build descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArg {
    pub name: String,
    pub value: String,
}

/// Version and commit stamped into a provenance build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub version: String,
    pub commit_sha: String,
}

impl Provenance {
    pub fn new(version: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            commit_sha: commit_sha.into(),
        }
    }
}

/// Everything the engine needs to build an image from a source tree's
/// build descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecipe {
    pub context: SourceTree,
    pub build_args: Vec<BuildArg>,
    pub labels: Vec<(String, String)>,
}

impl ImageRecipe {
    /// Plain build of the descriptor found in `context`
    pub fn from_dockerfile(context: SourceTree) -> Self {
        Self {
            context,
            build_args: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn with_build_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.build_args.push(BuildArg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Sets a label, replacing any earlier value for the same key
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.labels.retain(|(existing, _)| *existing != key);
        self.labels.push((key, value.into()));
        self
    }

    /// Adds the commit and version build arguments and the creation label
    ///
    /// The timestamp is RFC3339 in UTC with second precision, e.g.
    /// `2024-05-01T12:00:00Z`.
    pub fn with_provenance(self, provenance: &Provenance, created: DateTime<Utc>) -> Self {
        self.with_build_arg(GIT_SHA_BUILD_ARG, &provenance.commit_sha)
            .with_build_arg(VERSION_BUILD_ARG, &provenance.version)
            .with_label(
                CREATED_LABEL,
                created.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }
}

/// An image built by the engine, identified by its engine-local name
#[derive(Debug, Clone)]
pub struct Image {
    id: String,
    recipe: ImageRecipe,
    registry_auth: Option<RegistryCredentials>,
}

impl Image {
    pub fn new(id: impl Into<String>, recipe: ImageRecipe) -> Self {
        Self {
            id: id.into(),
            recipe,
            registry_auth: None,
        }
    }

    /// Attaches the credentials used when this image is published
    pub fn with_registry_auth(mut self, credentials: RegistryCredentials) -> Self {
        self.registry_auth = Some(credentials);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recipe(&self) -> &ImageRecipe {
        &self.recipe
    }

    pub fn registry_auth(&self) -> Option<&RegistryCredentials> {
        self.registry_auth.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_plain_recipe_has_no_args_or_labels() {
        let recipe = ImageRecipe::from_dockerfile(SourceTree::new("services/app"));
        assert!(recipe.build_args.is_empty());
        assert!(recipe.labels.is_empty());
    }

    #[test]
    fn test_provenance_recipe() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        let recipe = ImageRecipe::from_dockerfile(SourceTree::new("services/app"))
            .with_provenance(&Provenance::new("1.2.3", "abc123"), created);

        assert_eq!(
            recipe.build_args,
            vec![
                BuildArg {
                    name: "GIT_SHA".to_string(),
                    value: "abc123".to_string()
                },
                BuildArg {
                    name: "VERSION".to_string(),
                    value: "1.2.3".to_string()
                },
            ]
        );
        assert_eq!(
            recipe.label("org.opencontainers.image.created"),
            Some("2024-05-01T12:30:15Z")
        );
    }

    #[test]
    fn test_with_label_replaces_existing_key() {
        let recipe = ImageRecipe::from_dockerfile(SourceTree::new("."))
            .with_label("a", "1")
            .with_label("a", "2");
        assert_eq!(recipe.labels.len(), 1);
        assert_eq!(recipe.label("a"), Some("2"));
    }
}
