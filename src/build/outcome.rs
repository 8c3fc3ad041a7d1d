//! Build outcome decision.

use serde::{Deserialize, Serialize};

/// Result of a build step, ordered from best to worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildOutcome {
    #[default]
    Success,
    Unstable,
    Failure,
}

impl BuildOutcome {
    /// Process exit code reported by the command line tool.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Unstable => 2,
        }
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// Exit code and diagnostic counts of one compiler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub warning_count: u64,
    pub error_count: u64,
}

/// The two independent signals a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// The step itself reports success.
    pub step_succeeded: bool,
    /// The build is marked unstable because of warnings.
    pub mark_unstable: bool,
}

impl Decision {
    /// Combined outcome: failure first, then the unstable overlay.
    #[must_use]
    pub fn outcome(self) -> BuildOutcome {
        if !self.step_succeeded {
            BuildOutcome::Failure
        } else if self.mark_unstable {
            BuildOutcome::Unstable
        } else {
            BuildOutcome::Success
        }
    }
}

/// Decide how a compiler run affects the build.
#[must_use]
pub fn decide(
    exit_code: i32,
    warning_count: u64,
    continue_on_build_failure: bool,
    unstable_if_warnings: bool,
) -> Decision {
    Decision {
        step_succeeded: continue_on_build_failure || exit_code == 0,
        mark_unstable: unstable_if_warnings && warning_count > 0,
    }
}
