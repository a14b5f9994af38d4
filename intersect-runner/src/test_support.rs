//! In-memory container engine for pipeline tests

use async_trait::async_trait;
use intersect_core::domain::{BuildArg, ExecEnvironment, Image, ImageRecipe};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::engine::{ContainerEngine, StepOutput};
use crate::error::{PipelineError, Result};

/// An engine call, as observed by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Run {
        base_image: String,
        steps: Vec<String>,
    },
    Build {
        context: PathBuf,
        build_args: Vec<BuildArg>,
        labels: Vec<(String, String)>,
    },
    Publish {
        image: String,
        reference: String,
        /// Username of the credentials attached when publish was called
        authenticated_as: Option<String>,
    },
}

/// Records every call and answers from a script instead of running anything
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    last_step_stdout: String,
    failing_step: Option<(usize, i32, String)>,
    failing_build: bool,
    failing_publish: Option<usize>,
    stalled_publish: Option<usize>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stdout reported by the last step of every run
    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.last_step_stdout = stdout.to_string();
        self
    }

    /// Makes step `index` exit with `exit_code`, printing `stderr`
    pub fn with_failing_step(mut self, index: usize, exit_code: i32, stderr: &str) -> Self {
        self.failing_step = Some((index, exit_code, stderr.to_string()));
        self
    }

    pub fn with_failing_build(mut self) -> Self {
        self.failing_build = true;
        self
    }

    /// Makes the `nth` publish (zero-based) fail
    pub fn with_failing_publish(mut self, nth: usize) -> Self {
        self.failing_publish = Some(nth);
        self
    }

    /// Makes the `nth` publish (zero-based) never complete
    pub fn with_stalled_publish(mut self, nth: usize) -> Self {
        self.stalled_publish = Some(nth);
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn builds(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, EngineCall::Build { .. }))
            .collect()
    }

    pub fn publishes(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, EngineCall::Publish { .. }))
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
    async fn version(&self) -> Result<String> {
        Ok("recording 1.0".to_string())
    }

    async fn run(&self, env: &ExecEnvironment) -> Result<Vec<StepOutput>> {
        self.record(EngineCall::Run {
            base_image: env.base_image().to_string(),
            steps: env.steps().iter().map(ToString::to_string).collect(),
        });

        let last = env.steps().len().saturating_sub(1);
        let mut outputs = Vec::new();
        for (index, step) in env.steps().iter().enumerate() {
            let mut output = StepOutput {
                command: step.to_string(),
                stdout: if index == last {
                    self.last_step_stdout.clone()
                } else {
                    String::new()
                },
                stderr: String::new(),
                exit_code: 0,
            };

            if let Some((failing, exit_code, stderr)) = &self.failing_step {
                if *failing == index {
                    output.exit_code = *exit_code;
                    output.stderr = stderr.clone();
                    outputs.push(output);
                    break;
                }
            }

            outputs.push(output);
        }

        Ok(outputs)
    }

    async fn build(&self, recipe: &ImageRecipe) -> Result<Image> {
        self.record(EngineCall::Build {
            context: recipe.context.path().to_path_buf(),
            build_args: recipe.build_args.clone(),
            labels: recipe.labels.clone(),
        });

        if self.failing_build {
            return Err(PipelineError::Build {
                context: recipe.context.path().display().to_string(),
                diagnostics: "Dockerfile not found".to_string(),
            });
        }

        let id = format!("local/image-{}", self.builds().len());
        Ok(Image::new(id, recipe.clone()))
    }

    async fn publish(&self, image: &Image, reference: &str) -> Result<String> {
        let nth = self.publishes().len();
        self.record(EngineCall::Publish {
            image: image.id().to_string(),
            reference: reference.to_string(),
            authenticated_as: image.registry_auth().map(|c| c.username.clone()),
        });

        if self.stalled_publish == Some(nth) {
            std::future::pending::<()>().await;
        }

        if self.failing_publish == Some(nth) {
            return Err(PipelineError::Publish {
                reference: reference.to_string(),
                diagnostics: "unauthorized".to_string(),
            });
        }

        Ok(reference.to_string())
    }
}
