//! Build log and build result seams.

use super::outcome::BuildOutcome;

/// User-visible log of a build.
pub trait BuildListener {
    /// Informational message.
    fn info(&mut self, message: &str);

    /// Message explaining why the build failed.
    fn fatal_error(&mut self, message: &str);
}

/// Write-only result of the build a step belongs to.
pub trait ResultSignal {
    fn set_result(&mut self, outcome: BuildOutcome);
}

/// Result recorder that only ever moves toward worse outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepResult {
    outcome: Option<BuildOutcome>,
}

impl StepResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome recorded so far; `None` if nothing was written.
    #[must_use]
    pub fn outcome(&self) -> Option<BuildOutcome> {
        self.outcome
    }
}

impl ResultSignal for StepResult {
    fn set_result(&mut self, outcome: BuildOutcome) {
        let next = self.outcome.map_or(outcome, |current| current.max(outcome));
        tracing::debug!(previous = ?self.outcome, requested = ?outcome, result = ?next, "Build result");
        self.outcome = Some(next);
    }
}

/// Listener that keeps every message, for embedding and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingListener {
    pub messages: Vec<String>,
    pub fatal: Vec<String>,
}

impl BuildListener for RecordingListener {
    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn fatal_error(&mut self, message: &str) {
        self.fatal.push(message.to_string());
    }
}
