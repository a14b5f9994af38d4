//! Source trees used as build and test input

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A directory of source code plus the entries to leave out when it is
/// mounted into an execution environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTree {
    path: PathBuf,
    exclude: Vec<String>,
}

impl SourceTree {
    /// Creates a source tree with no exclusions
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exclude: Vec::new(),
        }
    }

    /// Adds entries to the exclusion list, skipping ones already present
    ///
    /// Entries are paths relative to the tree root.
    pub fn with_exclude<I, S>(mut self, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entry in exclude {
            let entry = entry.into();
            if !self.exclude.contains(&entry) {
                self.exclude.push(entry);
            }
        }
        self
    }

    /// Returns the tree rooted at a subdirectory of this one
    ///
    /// The exclusion list is not inherited.
    pub fn directory(&self, subdirectory: impl AsRef<Path>) -> Self {
        Self::new(self.path.join(subdirectory))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_joins_and_drops_exclusions() {
        let root = SourceTree::new("services").with_exclude([".venv"]);
        let dashboard = root.directory("nsdf_intersect_dashboard");

        assert_eq!(
            dashboard.path(),
            Path::new("services").join("nsdf_intersect_dashboard")
        );
        assert!(dashboard.exclude().is_empty());
        assert_eq!(root.exclude(), [".venv".to_string()]);
    }

    #[test]
    fn test_with_exclude_merges_without_duplicates() {
        let tree = SourceTree::new("app")
            .with_exclude([".venv"])
            .with_exclude([".venv", "dist"]);
        assert_eq!(tree.exclude(), [".venv".to_string(), "dist".to_string()]);
    }
}
