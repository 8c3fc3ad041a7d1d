//! Integration tests for the compile step.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pbc_compile::build::{
    BuildContext, BuildOutcome, CompileError, CompileStep, RecordingListener, StepResult, StepRun,
    StepSettings,
};
use pbc_compile::console::{Annotation, NoteTag};
use pbc_compile::process::{
    ExecutionRequest, Launcher, OutputStream, PlatformFamily, RunningProcess, SpawnError,
};
use pbc_compile::tool::{InstallationStore, LocalNode, ToolInstallation};
use tokio::io::DuplexStream;

const COMPILER_OUTPUT: &[u8] = b"Compiling app.pbl...\r\n\
app.pbl(12,4): Warning W100: unused variable\r\n\
Done.\r\n";

/// Launcher that replays canned output instead of starting a process.
struct ScriptedLauncher {
    output: Vec<u8>,
    exit_code: Option<i32>,
    hang: bool,
    stdout: Mutex<Option<OutputStream>>,
    requests: Mutex<Vec<ExecutionRequest>>,
    terminated: Arc<AtomicBool>,
}

impl ScriptedLauncher {
    fn new(output: &[u8], exit_code: Option<i32>) -> Self {
        Self {
            output: output.to_vec(),
            exit_code,
            hang: false,
            stdout: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A process whose stdout never closes.
    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(b"", Some(0))
        }
    }

    /// A process whose stdout is `stdout`.
    fn with_stdout(stdout: OutputStream, exit_code: Option<i32>) -> Self {
        let launcher = Self::new(b"", exit_code);
        *launcher.stdout.lock().unwrap() = Some(stdout);
        launcher
    }

    fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, request: &ExecutionRequest) -> Result<Box<dyn RunningProcess>, SpawnError> {
        self.requests.lock().unwrap().push(request.clone());

        let scripted = self.stdout.lock().unwrap().take();
        let (stdout, writer): (OutputStream, Option<DuplexStream>) = if let Some(stdout) = scripted {
            (stdout, None)
        } else if self.hang {
            let (reader, writer) = tokio::io::duplex(64);
            (Box::new(reader), Some(writer))
        } else {
            (Box::new(std::io::Cursor::new(self.output.clone())), None)
        };

        Ok(Box::new(ScriptedProcess {
            stdout: Some(stdout),
            _writer: writer,
            exit_code: self.exit_code,
            terminated: Arc::clone(&self.terminated),
        }))
    }
}

struct ScriptedProcess {
    stdout: Option<OutputStream>,
    _writer: Option<DuplexStream>,
    exit_code: Option<i32>,
    terminated: Arc<AtomicBool>,
}

#[async_trait]
impl RunningProcess for ScriptedProcess {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout.take()
    }

    async fn wait(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self.exit_code)
    }

    async fn terminate(&mut self, _timeout: Duration) -> std::io::Result<()> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingLauncher;

impl Launcher for FailingLauncher {
    fn launch(&self, _request: &ExecutionRequest) -> Result<Box<dyn RunningProcess>, SpawnError> {
        Err(SpawnError::NotFound)
    }
}

struct StepOutput {
    run: Result<StepRun, CompileError>,
    listener: RecordingListener,
    result: StepResult,
    raw: Vec<u8>,
    notes: Vec<Annotation>,
}

async fn run_step(settings: StepSettings, ctx: &BuildContext<'_>) -> StepOutput {
    let mut listener = RecordingListener::default();
    let mut result = StepResult::new();
    let mut raw = Vec::new();
    let mut notes = Vec::new();

    let run = CompileStep::new(settings)
        .run(ctx, &mut listener, &mut result, &mut raw, &mut notes)
        .await;

    let notes = Annotation::parse_all(std::str::from_utf8(&notes).unwrap()).unwrap();
    StepOutput {
        run,
        listener,
        result,
        raw,
        notes,
    }
}

fn unix_node() -> LocalNode {
    LocalNode::new("test").with_platform(PlatformFamily::Unix)
}

fn settings(cmd_line_args: &str) -> StepSettings {
    StepSettings {
        cmd_line_args: cmd_line_args.to_string(),
        ..StepSettings::default()
    }
}

/// Installation home containing an empty `pbc190.exe`.
fn installation_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pbc190.exe"), b"").unwrap();
    dir
}

#[tokio::test]
async fn runs_exec_name_directly_without_installation() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(COMPILER_OUTPUT, Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings("/d app.pbt /o app.exe"), &ctx).await;

    let requests = launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].executable, "pbc190.exe");
    assert_eq!(requests[0].args, vec!["/d", "app.pbt", "/o", "app.exe"]);

    assert_eq!(out.listener.messages[0], "Path to pbc utility: pbc190.exe");
    assert!(out.listener.messages[1].starts_with("Executing the command "));
    assert!(out.listener.messages[1].contains("app.pbt"));
    assert!(out.listener.fatal.is_empty());

    match out.run.unwrap() {
        StepRun::Completed { outcome, execution } => {
            assert_eq!(outcome, BuildOutcome::Success);
            assert_eq!(execution.exit_code, 0);
            assert_eq!(execution.warning_count, 1);
            assert_eq!(execution.error_count, 0);
        }
        StepRun::Cancelled => panic!("step should complete"),
    }
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Success));
}

#[tokio::test]
async fn raw_log_is_byte_identical_and_notes_point_into_it() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(COMPILER_OUTPUT, Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings(""), &ctx).await;

    assert_eq!(out.raw, COMPILER_OUTPUT);
    assert_eq!(out.notes.len(), 1);
    let note = out.notes[0];
    assert_eq!(note.tag, NoteTag::WarningInline);
    assert_eq!(note.line, 1);
    let start = usize::try_from(note.start).unwrap();
    let end = usize::try_from(note.end).unwrap();
    assert_eq!(
        &out.raw[start..end],
        b"app.pbl(12,4): Warning W100: unused variable\r\n"
    );
}

#[tokio::test]
async fn warnings_mark_build_unstable_when_enabled() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(COMPILER_OUTPUT, Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            unstable_if_warnings: true,
            ..settings("")
        },
        &ctx,
    )
    .await;

    assert!(out
        .listener
        .messages
        .contains(&"> Set build UNSTABLE because there are warnings.".to_string()));
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Unstable));
}

#[tokio::test]
async fn nonzero_exit_fails_build() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(b"Error E200: syntax error\n", Some(1));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings(""), &ctx).await;

    match out.run.unwrap() {
        StepRun::Completed { outcome, execution } => {
            assert_eq!(outcome, BuildOutcome::Failure);
            assert_eq!(execution.error_count, 1);
        }
        StepRun::Cancelled => panic!("step should complete"),
    }
    assert!(out.listener.fatal.is_empty());
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
}

#[tokio::test]
async fn continue_on_build_failure_reports_success() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(b"Error E200: syntax error\n", Some(1));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            continue_on_build_failure: true,
            ..settings("")
        },
        &ctx,
    )
    .await;

    assert_eq!(out.result.outcome(), Some(BuildOutcome::Success));
}

#[tokio::test]
async fn resolves_executable_inside_installation_home() {
    let dir = installation_dir();
    let home = dir.path().display().to_string();
    let node = unix_node();
    let store = InstallationStore::new(vec![ToolInstallation::new(
        "PB 2019",
        home.clone(),
        Some("/q".to_string()),
    )]);
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            installation: Some("PB 2019".to_string()),
            ..settings("/d app.pbt")
        },
        &ctx,
    )
    .await;

    assert!(out.run.is_ok());
    let expected = format!("{home}/pbc190.exe");
    let requests = launcher.requests();
    assert_eq!(requests[0].executable, expected);
    assert_eq!(requests[0].args, vec!["/q", "/d", "app.pbt"]);
    assert_eq!(out.listener.messages[0], format!("Path to pbc utility: {expected}"));
}

#[tokio::test]
async fn node_tool_location_overrides_home() {
    let dir = installation_dir();
    let location = dir.path().display().to_string();
    let node = unix_node().with_tool_locations(HashMap::from([(
        "PB 2019".to_string(),
        location.clone(),
    )]));
    let store = InstallationStore::new(vec![ToolInstallation::new(
        "PB 2019",
        "/does/not/exist",
        None,
    )]);
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            installation: Some("PB 2019".to_string()),
            ..settings("")
        },
        &ctx,
    )
    .await;

    assert!(out.run.is_ok());
    assert_eq!(launcher.requests()[0].executable, format!("{location}/pbc190.exe"));
}

#[tokio::test]
async fn missing_executable_fails_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().display().to_string();
    let node = unix_node();
    let store = InstallationStore::new(vec![ToolInstallation::new("PB", home.clone(), None)]);
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            installation: Some("PB".to_string()),
            ..settings("")
        },
        &ctx,
    )
    .await;

    let err = out.run.unwrap_err();
    assert!(matches!(err, CompileError::ToolNotFound(_)));
    assert!(err.is_pre_launch());
    assert_eq!(out.listener.fatal, vec![format!("{home}/pbc190.exe doesn't exist")]);
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
    assert!(launcher.requests().is_empty());
}

#[tokio::test]
async fn unknown_installation_fails_before_launch() {
    let node = unix_node();
    let store = InstallationStore::new(vec![ToolInstallation::new("PB 2019", "/opt/pb", None)]);
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            installation: Some("pb 2019".to_string()),
            ..settings("")
        },
        &ctx,
    )
    .await;

    assert!(matches!(out.run, Err(CompileError::InstallationNotFound(_))));
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
    assert_eq!(out.listener.fatal.len(), 1);
    assert!(launcher.requests().is_empty());
}

#[tokio::test]
async fn unterminated_quote_fails_before_launch() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings("/d \"app.pbt"), &ctx).await;

    assert!(matches!(out.run, Err(CompileError::MalformedArgument(_))));
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
    assert!(launcher.requests().is_empty());
}

#[tokio::test]
async fn launch_failure_is_fatal() {
    let node = unix_node();
    let store = InstallationStore::default();
    let ctx = BuildContext::new(&node, &store, &FailingLauncher);

    let out = run_step(settings(""), &ctx).await;

    let err = out.run.unwrap_err();
    assert!(matches!(err, CompileError::Launch { .. }));
    assert!(!err.is_pre_launch());
    assert_eq!(out.listener.fatal, vec!["Failed to launch pbc190.exe: Executable not found"]);
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
}

#[tokio::test]
async fn process_without_exit_code_is_fatal() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(b"Compiling\n", None);
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings(""), &ctx).await;

    assert!(matches!(out.run, Err(CompileError::Terminated)));
    assert_eq!(out.raw, b"Compiling\n");
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
}

#[tokio::test]
async fn read_failure_stops_process_and_keeps_partial_output() {
    let stdout = tokio_test::io::Builder::new()
        .read(b"Error E1: a\npart")
        .read_error(std::io::Error::other("pipe broke"))
        .build();
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::with_stdout(Box::new(stdout), Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings(""), &ctx).await;

    let err = out.run.unwrap_err();
    assert!(matches!(err, CompileError::Io(_)));
    assert!(err.to_string().contains("pipe broke"));
    assert_eq!(out.raw, b"Error E1: a\npart");
    assert_eq!(out.notes.len(), 1);
    assert_eq!(out.notes[0].tag, NoteTag::ErrorInline);
    assert_eq!(out.listener.fatal.len(), 1);
    assert_eq!(out.result.outcome(), Some(BuildOutcome::Failure));
    assert!(launcher.was_terminated());
}

#[tokio::test]
async fn cancellation_stops_process_without_result() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::hanging();
    let ctx = BuildContext::new(&node, &store, &launcher);
    ctx.cancel.cancel();

    let out = run_step(settings(""), &ctx).await;

    assert_eq!(out.run.unwrap(), StepRun::Cancelled);
    assert!(launcher.was_terminated());
    assert_eq!(out.result.outcome(), None);
    assert!(out.listener.fatal.is_empty());
}

#[tokio::test]
async fn windows_node_wraps_command_in_cmd() {
    let node = LocalNode::new("win").with_platform(PlatformFamily::Windows);
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(settings("/d app.pbt"), &ctx).await;

    assert!(out.run.is_ok());
    let request = &launcher.requests()[0];
    assert_eq!(request.executable, "cmd.exe");
    assert_eq!(
        request.args,
        vec![
            "/C",
            "\"",
            "chcp",
            "65001",
            "&&",
            "pbc190.exe",
            "/d",
            "app.pbt",
            "\"",
            "&&",
            "exit",
            "%ERRORLEVEL%",
        ]
    );
}

#[tokio::test]
async fn arguments_expand_environment_then_build_variables() {
    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = ScriptedLauncher::new(b"", Some(0));
    let mut ctx = BuildContext::new(&node, &store, &launcher);
    ctx.environment.insert("TARGET".to_string(), "${WORKSPACE}/app.pbt".to_string());
    ctx.build_variables.insert("WORKSPACE".to_string(), "/ws".to_string());
    ctx.module_root = PathBuf::from("/ws");

    let out = run_step(settings("/d $TARGET /o ${MISSING}"), &ctx).await;

    assert!(out.run.is_ok());
    let request = &launcher.requests()[0];
    assert_eq!(request.args, vec!["/d", "/ws/app.pbt", "/o", "${MISSING}"]);
    assert_eq!(request.working_directory, PathBuf::from("/ws"));
}

#[cfg(unix)]
#[tokio::test]
async fn runs_real_process_through_local_launcher() {
    use pbc_compile::process::LocalLauncher;

    let node = unix_node();
    let store = InstallationStore::default();
    let launcher = LocalLauncher::new();
    let ctx = BuildContext::new(&node, &store, &launcher);

    let out = run_step(
        StepSettings {
            exec_name: "sh".to_string(),
            unstable_if_warnings: true,
            ..settings("-c \"printf 'a.pbl(1): warning W1: unused\\n'; exit 3\"")
        },
        &ctx,
    )
    .await;

    match out.run.unwrap() {
        StepRun::Completed { outcome, execution } => {
            assert_eq!(outcome, BuildOutcome::Failure);
            assert_eq!(execution.exit_code, 3);
            assert_eq!(execution.warning_count, 1);
        }
        StepRun::Cancelled => panic!("step should complete"),
    }
    assert_eq!(out.raw, b"a.pbl(1): warning W1: unused\n");
    assert_eq!(out.notes.len(), 1);
}
