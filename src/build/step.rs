//! The compile build step.
//!
//! Connects installation resolution, command construction, the launcher,
//! the console annotator and the outcome decision for one compiler run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::command::{CommandBuilder, Variables};
use crate::console::{ConsoleAnnotator, StreamEnd};
use crate::process::{
    ExecutionRequest, Launcher, OutputCharset, RunningProcess, DEFAULT_TERMINATE_TIMEOUT,
};
use crate::tool::{full_executable_path, resolve, ExecutionNode, InstallationStore};

use super::error::CompileError;
use super::listener::{BuildListener, ResultSignal};
use super::outcome::{decide, BuildOutcome, ExecutionOutcome};

/// Default name of the pbc executable inside an installation.
pub const DEFAULT_EXEC_NAME: &str = "pbc190.exe";

/// Per-step configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSettings {
    /// Executable file name, or the full command when no installation is
    /// selected.
    pub exec_name: String,
    /// Name of the installation to run.
    pub installation: Option<String>,
    /// Arguments passed to the compiler.
    pub cmd_line_args: String,
    /// Report success whatever the exit code.
    pub continue_on_build_failure: bool,
    /// Mark the build unstable when warnings are seen.
    pub unstable_if_warnings: bool,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            exec_name: DEFAULT_EXEC_NAME.to_string(),
            installation: None,
            cmd_line_args: String::new(),
            continue_on_build_failure: false,
            unstable_if_warnings: false,
        }
    }
}

/// What a step runs against.
pub struct BuildContext<'a> {
    pub node: &'a dyn ExecutionNode,
    pub installations: &'a InstallationStore,
    pub launcher: &'a dyn Launcher,
    /// Environment of the build, passed to the compiler.
    pub environment: Variables,
    /// Build-scoped variables available to argument expansion.
    pub build_variables: Variables,
    /// Directory the compiler runs in.
    pub module_root: PathBuf,
    pub charset: OutputCharset,
    pub cancel: CancellationToken,
}

impl<'a> BuildContext<'a> {
    #[must_use]
    pub fn new(
        node: &'a dyn ExecutionNode,
        installations: &'a InstallationStore,
        launcher: &'a dyn Launcher,
    ) -> Self {
        Self {
            node,
            installations,
            launcher,
            environment: Variables::new(),
            build_variables: Variables::new(),
            module_root: PathBuf::from("."),
            charset: OutputCharset::default(),
            cancel: CancellationToken::new(),
        }
    }
}

/// How a step run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRun {
    /// The compiler ran to completion.
    Completed {
        outcome: BuildOutcome,
        execution: ExecutionOutcome,
    },
    /// The build was cancelled and the compiler stopped.
    Cancelled,
}

/// Runs the pbc compiler as a build step.
#[derive(Debug, Clone, Default)]
pub struct CompileStep {
    settings: StepSettings,
}

impl CompileStep {
    #[must_use]
    pub fn new(settings: StepSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    /// Run the compiler once.
    ///
    /// Raw output goes to `raw` and annotations to `notes`. The outcome is
    /// written to `signal` unless the build is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` when the step cannot run the compiler to
    /// completion. The error is also reported to `listener` and the build
    /// is marked as failed.
    pub async fn run<R, A>(
        &self,
        ctx: &BuildContext<'_>,
        listener: &mut dyn BuildListener,
        signal: &mut dyn ResultSignal,
        raw: R,
        notes: A,
    ) -> Result<StepRun, CompileError>
    where
        R: AsyncWrite + Unpin,
        A: AsyncWrite + Unpin,
    {
        match self.execute(ctx, listener, raw, notes).await {
            Ok(StepRun::Completed { outcome, execution }) => {
                signal.set_result(outcome);
                Ok(StepRun::Completed { outcome, execution })
            }
            Ok(StepRun::Cancelled) => Ok(StepRun::Cancelled),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    pre_launch = err.is_pre_launch(),
                    "Compile step failed"
                );
                listener.fatal_error(&err.to_string());
                signal.set_result(BuildOutcome::Failure);
                Err(err)
            }
        }
    }

    /// Resolve the executable and the installation's default arguments.
    async fn resolve_executable(
        &self,
        ctx: &BuildContext<'_>,
        listener: &mut dyn BuildListener,
    ) -> Result<(String, Option<String>), CompileError> {
        let exec_name = &self.settings.exec_name;
        let Some(name) = &self.settings.installation else {
            listener.info(&format!("Path to pbc utility: {exec_name}"));
            return Ok((exec_name.clone(), None));
        };

        let installation = ctx.installations.find(name)?;
        let resolved = resolve(&installation, ctx.node, &ctx.environment).map_err(|source| {
            CompileError::Node {
                path: installation.home().to_string(),
                source,
            }
        })?;

        let path = full_executable_path(ctx.node, resolved.home(), exec_name)
            .await
            .map_err(|source| CompileError::Node {
                path: resolved.home().to_string(),
                source,
            })?;

        match ctx.node.exists(&path).await {
            Ok(true) => {}
            Ok(false) => return Err(CompileError::ToolNotFound(path)),
            Err(source) => return Err(CompileError::Node { path, source }),
        }

        tracing::debug!(installation = %name, node = ctx.node.name(), path = %path, "Resolved pbc");
        listener.info(&format!("Path to pbc utility: {path}"));
        Ok((path, resolved.default_args().map(str::to_string)))
    }

    fn build_request(
        &self,
        ctx: &BuildContext<'_>,
        executable: String,
        default_args: Option<String>,
    ) -> Result<ExecutionRequest, CompileError> {
        let request = CommandBuilder::new(executable)
            .default_args(default_args)
            .cmd_line_args(self.settings.cmd_line_args.clone())
            .environment(ctx.environment.clone())
            .build_variables(ctx.build_variables.clone())
            .working_dir(ctx.module_root.clone())
            .platform(ctx.node.platform())
            .charset(ctx.charset.clone())
            .build()?;
        Ok(request)
    }

    async fn execute<R, A>(
        &self,
        ctx: &BuildContext<'_>,
        listener: &mut dyn BuildListener,
        raw: R,
        notes: A,
    ) -> Result<StepRun, CompileError>
    where
        R: AsyncWrite + Unpin,
        A: AsyncWrite + Unpin,
    {
        let (executable, default_args) = self.resolve_executable(ctx, listener).await?;
        let request = self.build_request(ctx, executable, default_args)?;

        listener.info(&format!(
            "Executing the command {} from {}",
            request.to_string_with_quote(),
            request.working_directory.display()
        ));

        let mut process = ctx
            .launcher
            .launch(&request)
            .map_err(|source| CompileError::Launch {
                executable: request.executable.clone(),
                source,
            })?;
        let stdout = process.take_stdout().ok_or(CompileError::NoStdout)?;

        let mut annotator = ConsoleAnnotator::new(raw, notes, ctx.charset.clone());
        let end = match annotator.consume(stdout, &ctx.cancel).await {
            Ok(end) => end,
            Err(err) => {
                stop(process.as_mut()).await;
                if let Err(close_err) = annotator.close().await {
                    tracing::warn!(error = %close_err, "Failed to close console logs");
                }
                return Err(err.into());
            }
        };

        if end == StreamEnd::Cancelled {
            stop(process.as_mut()).await;
            annotator.close().await?;
            listener.info("Build cancelled, compiler stopped.");
            return Ok(StepRun::Cancelled);
        }

        let counts = annotator.close().await?;

        let status = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => None,
            status = process.wait() => Some(status?),
        };
        let Some(status) = status else {
            stop(process.as_mut()).await;
            listener.info("Build cancelled, compiler stopped.");
            return Ok(StepRun::Cancelled);
        };
        let exit_code = status.ok_or(CompileError::Terminated)?;

        let execution = ExecutionOutcome {
            exit_code,
            warning_count: counts.warnings,
            error_count: counts.errors,
        };
        let decision = decide(
            exit_code,
            counts.warnings,
            self.settings.continue_on_build_failure,
            self.settings.unstable_if_warnings,
        );

        tracing::info!(
            exit_code,
            warnings = counts.warnings,
            errors = counts.errors,
            outcome = %decision.outcome(),
            "Compiler finished"
        );

        if decision.mark_unstable {
            listener.info("> Set build UNSTABLE because there are warnings.");
        }

        Ok(StepRun::Completed {
            outcome: decision.outcome(),
            execution,
        })
    }
}

async fn stop(process: &mut dyn RunningProcess) {
    if let Err(e) = process.terminate(DEFAULT_TERMINATE_TIMEOUT).await {
        tracing::warn!(error = %e, "Failed to terminate compiler");
    }
}
