//! Podman container engine
//!
//! Drives the `podman` CLI (or any docker-compatible CLI) for the pipeline:
//! - Checking engine availability
//! - Running execution environments in a throwaway container
//! - Building images from a build descriptor
//! - Logging in, tagging, pushing and discarding images
//!
//! Every child process is killed if the calling future is dropped, and
//! containers are force-removed when their guard goes out of scope. Registry
//! logins go to a throwaway auth file that lives for one publish only.

use async_trait::async_trait;
use intersect_core::domain::{ExecEnvironment, Image, ImageRecipe};
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{ContainerEngine, StepOutput, join_output};
use crate::error::{PipelineError, Result};

/// Local repository used for images between build and push
const LOCAL_REPOSITORY: &str = "localhost/intersect-ci";

/// Auth file podman reads and writes inside a publish's auth directory
const AUTH_FILE: &str = "auth.json";

/// Container engine backed by the podman CLI
#[derive(Debug, Clone)]
pub struct PodmanEngine {
    binary: String,
}

impl PodmanEngine {
    /// Creates an engine driving `binary` (e.g. `podman` or `docker`)
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self, args: &[String], auth_dir: Option<&Path>) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // podman honors REGISTRY_AUTH_FILE, docker-compatible CLIs DOCKER_CONFIG
        if let Some(dir) = auth_dir {
            command
                .env("REGISTRY_AUTH_FILE", dir.join(AUTH_FILE))
                .env("DOCKER_CONFIG", dir);
        }
        command
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Runs the engine with `args` and captures its output
    async fn output(&self, args: &[String]) -> Result<Output> {
        self.output_with_auth(args, None).await
    }

    /// Same as [`PodmanEngine::output`], reading registry logins from `auth_dir`
    async fn output_with_auth(&self, args: &[String], auth_dir: Option<&Path>) -> Result<Output> {
        let command_line = self.command_line(args);
        debug!("Running: {}", command_line);

        let output = self
            .command(args, auth_dir)
            .output()
            .await
            .map_err(|e| PipelineError::engine(command_line.clone(), e))?;

        log_output(&command_line, &output);
        Ok(output)
    }

    /// Same as [`PodmanEngine::output_with_auth`], feeding `input` on stdin
    async fn output_with_stdin(
        &self,
        args: &[String],
        auth_dir: &Path,
        input: &str,
    ) -> Result<Output> {
        let command_line = self.command_line(args);
        debug!("Running: {}", command_line);

        let mut child = self
            .command(args, Some(auth_dir))
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::engine(command_line.clone(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| PipelineError::engine(command_line.clone(), e))?;
            // Dropping stdin closes the pipe so the engine stops reading
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PipelineError::engine(command_line.clone(), e))?;

        log_output(&command_line, &output);
        Ok(output)
    }

    /// Starts a detached container for `env`, mounting its source trees
    async fn start_container(&self, env: &ExecEnvironment, name: &str) -> Result<()> {
        let mut args = strings(&["run", "-d", "--name", name, "--entrypoint", "/bin/sh"]);

        for mount in env.mounts() {
            let host_path = tokio::fs::canonicalize(mount.source.path())
                .await
                .map_err(|e| PipelineError::EnvironmentSetup {
                    step: format!("mount {}", mount.source.path().display()),
                    exit_code: -1,
                    diagnostics: e.to_string(),
                })?;

            args.push("-v".to_string());
            args.push(format!("{}:{}", host_path.display(), mount.target));

            // Excluded entries are shadowed by empty in-memory mounts
            for excluded in mount.excluded_targets() {
                args.push("--tmpfs".to_string());
                args.push(excluded);
            }
        }

        args.push(env.base_image().to_string());
        args.push("-c".to_string());
        args.push("sleep infinity".to_string());

        let output = self.output(&args).await?;
        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let diagnostics = join_output(
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            );
            error!(
                "Failed to start container from {}: exit_code={}",
                env.base_image(),
                exit_code
            );
            return Err(PipelineError::EnvironmentSetup {
                step: format!("start {}", env.base_image()),
                exit_code,
                diagnostics,
            });
        }

        info!("Container {} started from {}", name, env.base_image());
        Ok(())
    }

    /// Removes a local image, warning if the engine refuses
    async fn remove_image(&self, image: &str) {
        match self.output(&strings(&["rmi", image])).await {
            Ok(output) if output.status.success() => debug!("Removed local image {}", image),
            Ok(output) => warn!(
                "Failed to remove local image {}: {}",
                image,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Failed to remove local image {}: {}", image, e),
        }
    }

    /// Logs in to the image's registry, writing the token under `auth_dir`
    async fn login(&self, image: &Image, reference: &str, auth_dir: &Path) -> Result<()> {
        let Some(credentials) = image.registry_auth() else {
            return Ok(());
        };

        info!(
            "Logging in to {} as {}",
            credentials.registry, credentials.username
        );

        let args = strings(&[
            "login",
            "--username",
            &credentials.username,
            "--password-stdin",
            &credentials.registry,
        ]);
        let output = self
            .output_with_stdin(&args, auth_dir, credentials.password.expose())
            .await?;

        if !output.status.success() {
            error!("Registry {} rejected the login", credentials.registry);
            return Err(PipelineError::Publish {
                reference: reference.to_string(),
                diagnostics: format!(
                    "login to {} failed: {}",
                    credentials.registry,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(())
    }

    async fn tag_and_push(&self, image: &Image, reference: &str, auth_dir: &Path) -> Result<()> {
        for args in [
            strings(&["tag", image.id(), reference]),
            strings(&["push", reference]),
        ] {
            let output = self.output_with_auth(&args, Some(auth_dir)).await?;
            if !output.status.success() {
                error!("'{}' failed", self.command_line(&args));
                return Err(PipelineError::Publish {
                    reference: reference.to_string(),
                    diagnostics: join_output(
                        &String::from_utf8_lossy(&output.stdout),
                        &String::from_utf8_lossy(&output.stderr),
                    ),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for PodmanEngine {
    async fn version(&self) -> Result<String> {
        let output = self.output(&strings(&["--version"])).await?;

        if !output.status.success() {
            return Err(PipelineError::EngineUnavailable(format!(
                "'{} --version' exited with {}",
                self.binary,
                output.status.code().unwrap_or(-1)
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Container engine is available: {}", version);
        Ok(version)
    }

    async fn run(&self, env: &ExecEnvironment) -> Result<Vec<StepOutput>> {
        let name = format!("intersect-ci-{}", Uuid::new_v4().simple());

        // Created first so a cancelled start still cleans up
        let _guard = ContainerGuard {
            binary: self.binary.clone(),
            name: name.clone(),
        };

        self.start_container(env, &name).await?;

        let mut outputs = Vec::with_capacity(env.steps().len());
        for step in env.steps() {
            let mut args = vec!["exec".to_string()];
            if let Some(workdir) = &step.workdir {
                args.push("-w".to_string());
                args.push(workdir.clone());
            }
            args.push(name.clone());
            args.extend(step.args.iter().cloned());

            let output = self.output(&args).await?;
            let step_output = StepOutput {
                command: step.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
            };

            let failed = !step_output.success();
            if failed {
                debug!(
                    "Step '{}' failed in container {}: exit_code={}",
                    step_output.command, name, step_output.exit_code
                );
            }

            outputs.push(step_output);
            if failed {
                break;
            }
        }

        Ok(outputs)
    }

    async fn build(&self, recipe: &ImageRecipe) -> Result<Image> {
        let tag = format!("{}:{}", LOCAL_REPOSITORY, Uuid::new_v4().simple());
        let context = recipe.context.path().display().to_string();

        let mut args = strings(&["build", "-t", &tag]);
        for arg in &recipe.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", arg.name, arg.value));
        }
        for (key, value) in &recipe.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(context.clone());

        info!("Building image {} from {}", tag, context);
        let output = self.output(&args).await?;

        if !output.status.success() {
            error!(
                "Build of {} failed: exit_code={}",
                context,
                output.status.code().unwrap_or(-1)
            );
            return Err(PipelineError::Build {
                context,
                diagnostics: join_output(
                    &String::from_utf8_lossy(&output.stdout),
                    &String::from_utf8_lossy(&output.stderr),
                ),
            });
        }

        Ok(Image::new(tag, recipe.clone()))
    }

    async fn publish(&self, image: &Image, reference: &str) -> Result<String> {
        // Removed with every login it holds when this publish ends
        let auth_dir = tempfile::Builder::new()
            .prefix("intersect-ci-auth-")
            .tempdir()
            .map_err(|e| PipelineError::engine("create registry auth directory", e))?;

        let result = match self.login(image, reference, auth_dir.path()).await {
            Ok(()) => self.tag_and_push(image, reference, auth_dir.path()).await,
            Err(e) => Err(e),
        };

        // The image is consumed by the publish either way
        if self.output(&strings(&["rmi", reference])).await.is_err() {
            debug!("Could not untag {}", reference);
        }
        self.remove_image(image.id()).await;

        result?;
        info!("Pushed {}", reference);
        Ok(reference.to_string())
    }
}

/// Force-removes a container when dropped
struct ContainerGuard {
    binary: String,
    name: String,
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let binary = std::mem::take(&mut self.binary);
        let name = std::mem::take(&mut self.name);

        // Keep the blocking `rm -f` off the async worker threads
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_container(&binary, &name));
            }
            Err(_) => remove_container(&binary, &name),
        }
    }
}

fn remove_container(binary: &str, name: &str) {
    let output = std::process::Command::new(binary)
        .arg("rm")
        .arg("-f") // Force remove
        .arg(name)
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            debug!("Container {} removed", name);
        }
        Ok(output) => {
            // Expected when the container never started
            debug!(
                "Container {} not removed: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Err(e) => {
            warn!("Failed to remove container {}: {}", name, e);
        }
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn log_output(command_line: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", command_line, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", command_line, stderr.trim());
    }
}
