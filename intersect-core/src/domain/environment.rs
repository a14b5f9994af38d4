//! Execution environments
//!
//! An [`ExecEnvironment`] describes a container the way a build script reads:
//! start from an image, mount directories, run commands. Building one is pure;
//! the runner's container engine materializes it and runs the steps in order.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::source::SourceTree;

/// A source tree mounted at a path inside the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub target: String,
    pub source: SourceTree,
}

impl Mount {
    /// Container paths of the excluded entries under this mount
    pub fn excluded_targets(&self) -> Vec<String> {
        self.source
            .exclude()
            .iter()
            .map(|entry| format!("{}/{}", self.target.trim_end_matches('/'), entry))
            .collect()
    }
}

/// A command run inside the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecStep {
    pub args: Vec<String>,
    /// Working directory in effect when the step was added
    pub workdir: Option<String>,
}

impl fmt::Display for ExecStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// A lazily described container: base image, mounts and ordered exec steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEnvironment {
    base_image: String,
    mounts: Vec<Mount>,
    workdir: Option<String>,
    steps: Vec<ExecStep>,
}

impl ExecEnvironment {
    /// Starts an environment from a base image
    pub fn from_image(image: impl Into<String>) -> Self {
        Self {
            base_image: image.into(),
            mounts: Vec::new(),
            workdir: None,
            steps: Vec::new(),
        }
    }

    /// Mounts a source tree at `target`, honoring the tree's exclusions
    pub fn with_directory(mut self, target: impl Into<String>, source: SourceTree) -> Self {
        self.mounts.push(Mount {
            target: target.into(),
            source,
        });
        self
    }

    /// Sets the working directory for subsequently added steps
    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Appends a command
    pub fn with_exec<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.push(ExecStep {
            args: args.into_iter().map(Into::into).collect(),
            workdir: self.workdir.clone(),
        });
        self
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn workdir(&self) -> Option<&str> {
        self.workdir.as_deref()
    }

    pub fn steps(&self) -> &[ExecStep] {
        &self.steps
    }
}
