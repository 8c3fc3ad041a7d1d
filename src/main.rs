//! pbc-compile - Run the PowerBuilder pbc compiler as a build step.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncWrite;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pbc_compile::build::{BuildContext, BuildOutcome, CompileStep, StepResult, StepRun};
use pbc_compile::command::Variables;
use pbc_compile::config::{CompileConfig, ConfigLoader};
use pbc_compile::console::{render_html, Annotation};
use pbc_compile::display::{self, ConsoleListener};
use pbc_compile::process::{LocalLauncher, OutputCharset};

/// Exit code of a cancelled build, as for a shell interrupted by SIGINT.
const EXIT_CANCELLED: u8 = 130;

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Parser)]
#[command(
    name = "pbc-compile",
    about = "Run the PowerBuilder pbc compiler as a build step",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the compiler once and report the build result.
    Run(RunArgs),
    /// List the configured installations.
    Installations,
    /// Render a console log and its annotations as HTML.
    Render {
        /// Raw console log written by `run --log`.
        log: PathBuf,
        /// Annotations written by `run --notes`.
        notes: PathBuf,
        /// Charset the log was written in.
        #[arg(long)]
        charset: Option<String>,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Installation to run.
    #[arg(short, long)]
    installation: Option<String>,
    /// Executable name inside the installation, or the full command.
    #[arg(long)]
    exec_name: Option<String>,
    /// Arguments passed to the compiler.
    #[arg(short, long, allow_hyphen_values = true)]
    args: Option<String>,
    /// Report success whatever the compiler's exit code.
    #[arg(long)]
    continue_on_build_failure: bool,
    /// Mark the build unstable when warnings are reported.
    #[arg(long)]
    unstable_if_warnings: bool,
    /// Charset the compiler writes its output in.
    #[arg(long)]
    charset: Option<String>,
    /// Directory to run the compiler in.
    #[arg(short = 'C', long)]
    workdir: Option<PathBuf>,
    /// Build variable available to argument expansion.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,
    /// Write the raw console output to this file instead of stdout.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Write annotations to this file.
    #[arg(long)]
    notes: Option<PathBuf>,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<CompileConfig> {
    let loader = match path {
        Some(path) if !path.exists() => {
            display::print_error(&format!("Config file {} not found", path.display()));
            return None;
        }
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    match loader.find_config_file() {
        Some(found) => tracing::info!(path = %found.display(), "Using config file"),
        None => tracing::debug!(search_paths = ?loader.search_paths(), "No config file, using defaults"),
    }
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            display::print_error(&e.to_string());
            None
        }
    }
}

fn outcome_exit_code(outcome: BuildOutcome) -> ExitCode {
    ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1))
}

async fn open_sink(path: Option<&Path>, fallback: Sink) -> std::io::Result<Sink> {
    match path {
        Some(path) => Ok(Box::new(tokio::fs::File::create(path).await?)),
        None => Ok(fallback),
    }
}

async fn run_step(config: &CompileConfig, args: RunArgs) -> ExitCode {
    let mut step = config.step.clone();
    if args.installation.is_some() {
        step.installation = args.installation;
    }
    if let Some(exec_name) = args.exec_name {
        step.exec_name = exec_name;
    }
    if let Some(cmd_line_args) = args.args {
        step.cmd_line_args = cmd_line_args;
    }
    if args.charset.is_some() {
        step.charset = args.charset;
    }
    step.continue_on_build_failure |= args.continue_on_build_failure;
    step.unstable_if_warnings |= args.unstable_if_warnings;

    let module_root = match args.workdir.map_or_else(std::env::current_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            display::print_error(&format!("Cannot determine working directory: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let mut build_variables: Variables = config.variables.clone();
    build_variables.extend(args.vars);
    build_variables
        .entry("WORKSPACE".to_string())
        .or_insert_with(|| module_root.display().to_string());

    let node = config.node.to_node();
    let store = config.installation_store();
    let launcher = LocalLauncher::new();

    let mut ctx = BuildContext::new(&node, &store, &launcher);
    ctx.environment = std::env::vars().collect();
    ctx.build_variables = build_variables;
    ctx.module_root = module_root;
    ctx.charset = step.output_charset();

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling build");
            cancel.cancel();
        }
    });

    let raw = match open_sink(args.log.as_deref(), Box::new(tokio::io::stdout())).await {
        Ok(sink) => sink,
        Err(e) => {
            display::print_error(&format!("Cannot open console log: {e}"));
            return ExitCode::FAILURE;
        }
    };
    let notes = match open_sink(args.notes.as_deref(), Box::new(tokio::io::sink())).await {
        Ok(sink) => sink,
        Err(e) => {
            display::print_error(&format!("Cannot open annotation log: {e}"));
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        installation = ?step.installation,
        exec_name = %step.exec_name,
        workdir = %ctx.module_root.display(),
        charset = %ctx.charset.label(),
        decoder = ctx.charset.decoder_name(),
        "Starting compile step"
    );

    let mut listener = ConsoleListener;
    let mut result = StepResult::new();
    let compile_step = CompileStep::new(step.to_settings());

    match compile_step.run(&ctx, &mut listener, &mut result, raw, notes).await {
        Ok(StepRun::Completed { outcome, execution }) => {
            display::print_outcome(outcome, &execution);
            outcome_exit_code(result.outcome().unwrap_or(outcome))
        }
        Ok(StepRun::Cancelled) => {
            display::print_cancelled();
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(_) => outcome_exit_code(result.outcome().unwrap_or(BuildOutcome::Failure)),
    }
}

async fn render(log: &Path, notes: &Path, charset: Option<String>, output: Option<&Path>) -> ExitCode {
    let raw = match tokio::fs::read(log).await {
        Ok(raw) => raw,
        Err(e) => {
            display::print_error(&format!("Cannot read {}: {e}", log.display()));
            return ExitCode::FAILURE;
        }
    };
    let notes = match tokio::fs::read_to_string(notes).await {
        Ok(content) => match Annotation::parse_all(&content) {
            Ok(notes) => notes,
            Err(e) => {
                display::print_error(&format!("Invalid annotations in {}: {e}", notes.display()));
                return ExitCode::FAILURE;
            }
        },
        Err(e) => {
            display::print_error(&format!("Cannot read {}: {e}", notes.display()));
            return ExitCode::FAILURE;
        }
    };

    let charset = charset.map_or_else(OutputCharset::utf8, OutputCharset::new);
    let html = render_html(&raw, &notes, &charset);

    match output {
        Some(path) => {
            if let Err(e) = tokio::fs::write(path, html).await {
                display::print_error(&format!("Cannot write {}: {e}", path.display()));
                return ExitCode::FAILURE;
            }
        }
        None => print!("{html}"),
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(config) = load_config(cli.config) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Commands::Run(args) => run_step(&config, args).await,
        Commands::Installations => {
            display::print_installations(&config.installation_store().installations());
            ExitCode::SUCCESS
        }
        Commands::Render {
            log,
            notes,
            charset,
            output,
        } => render(&log, &notes, charset, output.as_deref()).await,
    }
}
