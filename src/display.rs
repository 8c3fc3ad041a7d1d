//! Colored CLI display utilities for compile step output.
//!
//! This module provides the terminal build log used by the command line
//! tool: step messages, fatal errors, and the final build result.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::build::{BuildListener, BuildOutcome, ExecutionOutcome};
use crate::tool::ToolInstallation;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Summary of a compiler run, e.g. `exit code 0, 2 warnings, 0 errors`.
#[must_use]
pub fn format_execution(execution: &ExecutionOutcome) -> String {
    format!(
        "exit code {}, {} {}, {} {}",
        execution.exit_code,
        execution.warning_count,
        plural(execution.warning_count, "warning"),
        execution.error_count,
        plural(execution.error_count, "error"),
    )
}

fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Build log printed to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleListener;

impl BuildListener for ConsoleListener {
    fn info(&mut self, message: &str) {
        print_info(message);
    }

    fn fatal_error(&mut self, message: &str) {
        print_error(message);
    }
}

/// Print a step message.
pub fn print_info(message: &str) {
    println!("{} {} {}", timestamp().dimmed(), "[PBC]".blue().bold(), message);
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {} {}", timestamp().dimmed(), "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print the result of a completed step.
pub fn print_outcome(outcome: BuildOutcome, execution: &ExecutionOutcome) {
    let label = format!("[{outcome}]");
    let label = match outcome {
        BuildOutcome::Success => label.green().bold().to_string(),
        BuildOutcome::Unstable => label.yellow().bold().to_string(),
        BuildOutcome::Failure => label.red().bold().to_string(),
    };
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        label,
        format_execution(execution).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print that the build was cancelled.
pub fn print_cancelled() {
    println!("{} {} Build cancelled", timestamp().dimmed(), "[ABORTED]".magenta().bold());
    let _ = io::stdout().flush();
}

/// Print the configured installations.
pub fn print_installations(installations: &[ToolInstallation]) {
    if installations.is_empty() {
        println!("{}", "No pbc installations configured".dimmed());
    }
    for installation in installations {
        let args = installation
            .default_args()
            .map(|args| truncate(args, 60))
            .unwrap_or_default();
        println!(
            "{} {} {}",
            installation.name().cyan().bold(),
            installation.home(),
            args.dimmed()
        );
    }
    let _ = io::stdout().flush();
}
