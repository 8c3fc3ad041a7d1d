//! Diagnostic line patterns of the pbc console output.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Any character except a line terminator.
const ANY: &str = r"[^\n\r\x{85}\x{2028}\x{2029}]";

/// ASCII whitespace. `\s` and `\d` would also match Unicode spaces and
/// digits, which the compiler's output format does not allow.
const SPACE: &str = r"[ \t\n\x0B\x0C\r]";

/// `<text>error [CODE]: <text>`
static ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({ANY}*)(?i:error){SPACE}(([A-Z]*)[0-9]+)?:{SPACE}({ANY}*)$"
    ))
    .expect("error pattern is valid")
});

/// `<text>(line[,col]): warning [CODE]: <text>`
static WARNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({ANY}*)\([0-9]+(,[0-9]+)?\):{SPACE}(?i:warning){SPACE}(([A-Z]*)[0-9]+)?:{SPACE}({ANY}*)$"
    ))
    .expect("warning pattern is valid")
});

/// Kind of a console line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    Plain,
    Warning,
    Error,
}

/// Which diagnostic patterns a line matched.
///
/// The patterns are not exclusive; a line can match both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub error: bool,
    pub warning: bool,
}

impl Classification {
    /// Display kind of the line. Errors win over warnings.
    #[must_use]
    pub fn kind(self) -> LineKind {
        if self.error {
            LineKind::Error
        } else if self.warning {
            LineKind::Warning
        } else {
            LineKind::Plain
        }
    }
}

/// A decoded line and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub text: String,
    pub kind: LineKind,
}

/// Strip trailing CR/LF characters.
#[must_use]
pub fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Match a line, without its terminator, against both patterns.
#[must_use]
pub fn classify(text: &str) -> Classification {
    Classification {
        error: ERROR.is_match(text),
        warning: WARNING.is_match(text),
    }
}

/// Classify a raw decoded line, terminator included.
#[must_use]
pub fn classify_line(line: &str) -> ClassifiedLine {
    let text = trim_eol(line);
    ClassifiedLine {
        text: text.to_string(),
        kind: classify(text).kind(),
    }
}
