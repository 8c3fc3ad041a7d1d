//! Command line assembly for the compiler.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::process::{ExecutionRequest, OutputCharset, PlatformFamily};

use super::macros::{expand_two_pass, Variables};
use super::tokenize::{tokenize_args, MalformedArgumentError};

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\r\n]+").expect("line break pattern is valid"));

/// Collapse tabs and line breaks into single spaces.
///
/// Argument fields are single-line; text pasted from elsewhere often is not.
#[must_use]
pub fn normalize_line_breaks(args: &str) -> String {
    LINE_BREAKS.replace_all(args, " ").into_owned()
}

/// Wrap a command line for the target platform.
///
/// On Windows the command runs inside `cmd.exe /C "..."`, optionally after
/// switching the console to `code_page`, and the shell exits with the
/// wrapped command's error level. Other platforms get `inner` unchanged.
#[must_use]
pub fn wrap_for_platform(platform: PlatformFamily, code_page: u32, inner: Vec<String>) -> Vec<String> {
    match platform {
        PlatformFamily::Unix => inner,
        PlatformFamily::Windows => {
            let mut args: Vec<String> = vec!["cmd.exe".into(), "/C".into(), "\"".into()];
            if code_page != 0 {
                args.extend([String::from("chcp"), code_page.to_string(), String::from("&&")]);
            }
            args.extend(inner);
            args.extend(["\"", "&&", "exit", "%ERRORLEVEL%"].map(String::from));
            args
        }
    }
}

/// Builder for the compiler command line.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    executable: String,
    default_args: Option<String>,
    cmd_line_args: String,
    environment: Variables,
    build_variables: Variables,
    working_dir: PathBuf,
    platform: PlatformFamily,
    charset: OutputCharset,
}

impl CommandBuilder {
    /// Create a builder that runs `executable`.
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            default_args: None,
            cmd_line_args: String::new(),
            environment: Variables::new(),
            build_variables: Variables::new(),
            working_dir: PathBuf::from("."),
            platform: PlatformFamily::current(),
            charset: OutputCharset::default(),
        }
    }

    /// Arguments configured on the installation, placed right after the
    /// executable.
    #[must_use]
    pub fn default_args(mut self, args: Option<String>) -> Self {
        self.default_args = args;
        self
    }

    /// User-supplied arguments, subject to macro expansion.
    #[must_use]
    pub fn cmd_line_args(mut self, args: impl Into<String>) -> Self {
        self.cmd_line_args = args.into();
        self
    }

    /// Environment passed to the process and used for the first expansion
    /// pass.
    #[must_use]
    pub fn environment(mut self, environment: Variables) -> Self {
        self.environment = environment;
        self
    }

    /// Build-scoped variables used for the second expansion pass.
    #[must_use]
    pub fn build_variables(mut self, variables: Variables) -> Self {
        self.build_variables = variables;
        self
    }

    /// Directory the compiler runs in.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Platform family of the node the command runs on.
    #[must_use]
    pub fn platform(mut self, platform: PlatformFamily) -> Self {
        self.platform = platform;
        self
    }

    /// Charset of the compiler output.
    #[must_use]
    pub fn charset(mut self, charset: OutputCharset) -> Self {
        self.charset = charset;
        self
    }

    /// Build the command line without platform wrapping.
    ///
    /// # Errors
    ///
    /// Returns `MalformedArgumentError` if the default or user arguments
    /// contain an unterminated quote.
    pub fn build_inner_args(&self) -> Result<Vec<String>, MalformedArgumentError> {
        let mut args = vec![self.executable.clone()];

        if let Some(defaults) = &self.default_args {
            args.extend(tokenize_args(defaults)?);
        }

        let normalized = normalize_line_breaks(&self.cmd_line_args);
        let expanded = expand_two_pass(&normalized, &self.environment, &self.build_variables);
        if !expanded.trim().is_empty() {
            args.extend(tokenize_args(&expanded)?);
        }

        Ok(args)
    }

    /// Build the full command line, program first.
    ///
    /// # Errors
    ///
    /// Returns `MalformedArgumentError` if any argument string cannot be
    /// tokenized.
    pub fn build_args(&self) -> Result<Vec<String>, MalformedArgumentError> {
        let inner = self.build_inner_args()?;
        Ok(wrap_for_platform(self.platform, self.charset.code_page(), inner))
    }

    /// Build the request handed to the launcher.
    ///
    /// # Errors
    ///
    /// Returns `MalformedArgumentError` if any argument string cannot be
    /// tokenized.
    pub fn build(&self) -> Result<ExecutionRequest, MalformedArgumentError> {
        let mut args = self.build_args()?.into_iter();
        let executable = args.next().unwrap_or_default();

        Ok(ExecutionRequest {
            executable,
            args: args.collect(),
            working_directory: self.working_dir.clone(),
            environment: self.environment.clone(),
            output_charset: self.charset.clone(),
            platform: self.platform,
        })
    }
}
