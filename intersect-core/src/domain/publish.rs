//! Tags, publish modes and image reference naming

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::service::Service;
use crate::constants::{DEFAULT_REGISTRY, DEFAULT_TAG, EPHEMERAL_SUFFIX_BOUND};
use crate::error::{CoreError, Result};

/// Non-empty, ordered set of tags (or versions) to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Builds a tag set, falling back to `latest` when `tags` is empty
    ///
    /// Order is preserved and duplicates are kept: each entry is one publish.
    /// Entries are free-form versions; see [`validate_tag`] for the subset a
    /// registry accepts as a reference tag.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            return Self::latest();
        }

        Self(tags)
    }

    /// The single default tag
    pub fn latest() -> Self {
        Self(vec![DEFAULT_TAG.to_string()])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }
}

impl Default for TagSet {
    fn default() -> Self {
        Self::latest()
    }
}

/// Checks `tag` against the registry tag grammar `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`
pub fn validate_tag(tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() || first == '_' => {
            tag.len() <= 128
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTag(tag.to_string()))
    }
}

/// Whether a publish call pushes one tag or every tag it is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    Single,
    #[default]
    Multi,
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishMode::Single => f.write_str("single"),
            PublishMode::Multi => f.write_str("multi"),
        }
    }
}

impl FromStr for PublishMode {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(PublishMode::Single),
            "multi" => Ok(PublishMode::Multi),
            _ => Err(CoreError::InvalidPublishMode(s.to_string())),
        }
    }
}

/// References returned by a publish call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishOutcome {
    Single(String),
    Multi(Vec<String>),
}

impl PublishOutcome {
    /// Published references in publish order
    pub fn references(&self) -> Vec<&str> {
        match self {
            PublishOutcome::Single(reference) => vec![reference.as_str()],
            PublishOutcome::Multi(references) => references.iter().map(String::as_str).collect(),
        }
    }
}

/// True for the ephemeral registry that needs no credentials
pub fn is_default_registry(registry: &str) -> bool {
    registry == DEFAULT_REGISTRY
}

/// Computes the reference an image is pushed to
///
/// - Default registry: `ttl.sh/<service>-<n>` with `n` drawn from `rng` below
///   [`EPHEMERAL_SUFFIX_BOUND`]; the tag is not part of the name.
/// - Any other registry: `<registry>/<username>/<service>:<tag>`.
pub fn image_reference<R: Rng>(
    registry: &str,
    username: &str,
    service: Service,
    tag: &str,
    rng: &mut R,
) -> String {
    if is_default_registry(registry) {
        let suffix = rng.random_range(0..EPHEMERAL_SUFFIX_BOUND);
        format!("{}/{}-{}", registry, service.name(), suffix)
    } else {
        format!("{}/{}/{}:{}", registry, username, service.name(), tag)
    }
}
