//! Test environment and dashboard tests

use intersect_core::constants::SOURCE_MOUNT_PATH;
use intersect_core::domain::{ExecEnvironment, Service, SourceTree};
use tracing::{debug, error, info};

use super::Pipeline;
use crate::engine::{ContainerEngine, StepOutput};
use crate::error::{PipelineError, Result};

const TEST_COMMAND: [&str; 3] = ["uv", "run", "pytest"];

impl<E: ContainerEngine> Pipeline<E> {
    /// Describes the environment the dashboard tests run in
    ///
    /// Starts from the configured base image, mounts `source` (the dashboard
    /// when `None`) at `/src` without the configured exclusions, installs
    /// `uv` and syncs every dependency group. Nothing runs until the
    /// environment is handed to the engine.
    pub fn build_test_env(&self, source: Option<SourceTree>) -> ExecEnvironment {
        let source = source
            .unwrap_or_else(|| self.service_source(Service::Dashboard))
            .with_exclude(self.config.excludes.iter().cloned());

        ExecEnvironment::from_image(self.config.base_image.as_str())
            .with_directory(SOURCE_MOUNT_PATH, source)
            .with_exec(["pip", "install", "uv"])
            .with_workdir(SOURCE_MOUNT_PATH)
            .with_exec(["uv", "sync", "--all-groups"])
    }

    /// Builds the test environment and runs its setup steps
    pub async fn prepare_test_env(&self, source: Option<SourceTree>) -> Result<ExecEnvironment> {
        let env = self.build_test_env(source);
        info!("Preparing test environment from {}", env.base_image());

        let outputs = self.engine.run(&env).await?;
        check_setup(&outputs, env.steps().len())?;

        info!("Test environment ready");
        Ok(env)
    }

    /// Runs the dashboard test suite and returns its stdout verbatim
    pub async fn test_dashboard(&self, source: Option<SourceTree>) -> Result<String> {
        let env = self.build_test_env(source);
        let setup_steps = env.steps().len();
        let env = env.with_exec(TEST_COMMAND);

        info!("Running dashboard tests in {}", env.base_image());
        let outputs = self.engine.run(&env).await?;
        check_setup(&outputs, setup_steps)?;

        let test = outputs.get(setup_steps).ok_or_else(|| {
            PipelineError::EngineUnavailable(format!(
                "engine did not run '{}'",
                TEST_COMMAND.join(" ")
            ))
        })?;

        if !test.success() {
            error!("Dashboard tests failed with exit code {}", test.exit_code);
            return Err(PipelineError::TestFailed {
                exit_code: test.exit_code,
                diagnostics: test.diagnostics(),
            });
        }

        debug!("Captured {} bytes of test output", test.stdout.len());
        info!("Dashboard tests passed");
        Ok(test.stdout.clone())
    }
}

/// Fails with the first setup step that did not succeed
fn check_setup(outputs: &[StepOutput], setup_steps: usize) -> Result<()> {
    if let Some(failed) = outputs
        .iter()
        .take(setup_steps)
        .find(|output| !output.success())
    {
        error!(
            "Setup step '{}' failed with exit code {}",
            failed.command, failed.exit_code
        );
        return Err(PipelineError::EnvironmentSetup {
            step: failed.command.clone(),
            exit_code: failed.exit_code,
            diagnostics: failed.diagnostics(),
        });
    }

    if outputs.len() < setup_steps {
        return Err(PipelineError::EnvironmentSetup {
            step: "setup".to_string(),
            exit_code: -1,
            diagnostics: format!(
                "engine ran {} of {} setup steps",
                outputs.len(),
                setup_steps
            ),
        });
    }

    Ok(())
}
