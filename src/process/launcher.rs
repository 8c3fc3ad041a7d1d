//! Compiler process spawning and control.
//!
//! The [`Launcher`] trait is the seam between the build step and the
//! operating system. [`LocalLauncher`] spawns the compiler on this machine
//! with tokio; tests substitute scripted launchers.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use super::request::ExecutionRequest;
#[cfg(windows)]
use super::request::PlatformFamily;

/// Default timeout for graceful process termination.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Boxed stdout stream of a launched process.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The binary was not found.
    #[error("Executable not found")]
    NotFound,
    /// Permission denied when spawning.
    #[error("Permission denied")]
    PermissionDenied,
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// Starts compiler processes.
pub trait Launcher: Send + Sync {
    /// Start the process described by `request` with piped stdout.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process cannot be started.
    fn launch(&self, request: &ExecutionRequest) -> Result<Box<dyn RunningProcess>, SpawnError>;
}

/// A started process.
#[async_trait]
pub trait RunningProcess: Send {
    /// Take ownership of the stdout stream.
    ///
    /// This can only be called once; subsequent calls return `None`.
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Wait for the process to exit.
    ///
    /// Returns `None` when the process ended without an exit code, for
    /// example when killed by a signal.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    async fn wait(&mut self) -> std::io::Result<Option<i32>>;

    /// Stop the process, giving it `timeout` to exit on its own first
    /// where the platform allows it.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    async fn terminate(&mut self, timeout: Duration) -> std::io::Result<()>;
}

/// Launches processes on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

impl LocalLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for LocalLauncher {
    fn launch(&self, request: &ExecutionRequest) -> Result<Box<dyn RunningProcess>, SpawnError> {
        let mut cmd = Command::new(&request.executable);
        apply_args(&mut cmd, request);
        cmd.envs(&request.environment)
            .current_dir(&request.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(SpawnError::from_io)?;
        tracing::debug!(pid = ?child.id(), executable = %request.executable, "Spawned compiler");

        Ok(Box::new(LocalProcess { child }))
    }
}

#[cfg(windows)]
fn apply_args(cmd: &mut Command, request: &ExecutionRequest) {
    // cmd.exe parses its own command line, so the wrapper quotes must reach
    // it verbatim rather than escaped.
    if request.platform == PlatformFamily::Windows {
        for arg in &request.args {
            cmd.raw_arg(windows_raw_arg(arg));
        }
    } else {
        cmd.args(&request.args);
    }
}

#[cfg(not(windows))]
fn apply_args(cmd: &mut Command, request: &ExecutionRequest) {
    cmd.args(&request.args);
}

/// Quote an argument for a raw Windows command line.
///
/// Follows the C runtime parsing rules: backslashes are doubled where they
/// precede a quote or the closing quote. Bare quote tokens pass through as
/// they delimit the `cmd /C` payload.
#[must_use]
pub fn windows_raw_arg(arg: &str) -> String {
    if arg == "\"" || (!arg.is_empty() && !arg.contains([' ', '\t', '"'])) {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.push_str(&"\\".repeat(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.push_str(&"\\".repeat(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.push_str(&"\\".repeat(backslashes * 2));
    quoted.push('"');
    quoted
}

/// A compiler process running on the local machine.
#[derive(Debug)]
pub struct LocalProcess {
    child: Child,
}

impl LocalProcess {
    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    async fn graceful_terminate_unix(&mut self, timeout: Duration) -> std::io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.id() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            let _ = kill(nix_pid, Signal::SIGTERM);

            match tokio::time::timeout(timeout, self.child.wait()).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(_) => {
                    tracing::warn!(pid, "Compiler ignored SIGTERM, killing");
                    self.child.kill().await
                }
            }
        } else {
            // Process already exited
            Ok(())
        }
    }
}

#[async_trait]
impl RunningProcess for LocalProcess {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as OutputStream)
    }

    async fn wait(&mut self) -> std::io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn terminate(&mut self, timeout: Duration) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            self.graceful_terminate_unix(timeout).await
        }

        #[cfg(not(unix))]
        {
            let _ = timeout;
            self.child.kill().await
        }
    }
}
