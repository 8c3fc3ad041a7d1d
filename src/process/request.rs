//! Process invocation request types.

use std::borrow::Cow;
use std::path::PathBuf;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::command::{code_page_for, Variables};

/// Operating system family of the node that runs the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Windows,
    Unix,
}

impl PlatformFamily {
    /// Platform family of the machine this binary runs on.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Path separator used on this platform.
    #[must_use]
    pub fn separator(self) -> char {
        match self {
            Self::Windows => '\\',
            Self::Unix => '/',
        }
    }
}

impl Default for PlatformFamily {
    fn default() -> Self {
        Self::current()
    }
}

/// Charset the compiler's console output is decoded with.
///
/// Keeps the label exactly as configured, since the code page lookup works
/// on charset names that the decoder does not necessarily know.
#[derive(Debug, Clone)]
pub struct OutputCharset {
    label: String,
    encoding: &'static Encoding,
}

impl OutputCharset {
    /// Create a charset from a label such as `windows-1252` or `UTF-8`.
    ///
    /// Labels without a decoder fall back to UTF-8 for decoding.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let encoding = Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
            tracing::warn!(charset = %label, "No decoder for charset, decoding output as UTF-8");
            encoding_rs::UTF_8
        });
        Self { label, encoding }
    }

    /// UTF-8 output.
    #[must_use]
    pub fn utf8() -> Self {
        Self {
            label: "UTF-8".to_string(),
            encoding: encoding_rs::UTF_8,
        }
    }

    /// The configured label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the decoder in use.
    #[must_use]
    pub fn decoder_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Windows code page for this charset, `0` if unknown.
    #[must_use]
    pub fn code_page(&self) -> u32 {
        code_page_for(&self.label)
    }

    /// Decode raw output bytes, replacing malformed sequences.
    #[must_use]
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, _) = self.encoding.decode_without_bom_handling(bytes);
        text
    }
}

impl Default for OutputCharset {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Everything the launcher needs to start the compiler.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Program to execute (argv\[0\]).
    pub executable: String,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// Directory the process starts in.
    pub working_directory: PathBuf,
    /// Environment variables set on top of the inherited environment.
    pub environment: Variables,
    /// Charset of the process output.
    pub output_charset: OutputCharset,
    /// Platform the command line was built for.
    pub platform: PlatformFamily,
}

impl ExecutionRequest {
    /// The full command line, program first.
    #[must_use]
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.executable.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Render the command line for logs, quoting arguments where needed.
    #[must_use]
    pub fn to_string_with_quote(&self) -> String {
        self.command_line()
            .into_iter()
            .map(|arg| shell_escape::escape(Cow::Owned(arg)).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
