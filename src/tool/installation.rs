//! Named compiler installations and their per-node resolution.

use crate::command::{expand, Variables};

use super::node::ExecutionNode;

/// A named copy of the compiler.
///
/// Values are immutable; [`for_node`](Self::for_node) and
/// [`for_environment`](Self::for_environment) return translated copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInstallation {
    name: String,
    home: String,
    default_args: Option<String>,
}

impl ToolInstallation {
    /// Create an installation. Blank default arguments are dropped.
    #[must_use]
    pub fn new(name: impl Into<String>, home: impl Into<String>, default_args: Option<String>) -> Self {
        Self {
            name: name.into(),
            home: home.into(),
            default_args: default_args.filter(|args| !args.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install directory or executable path.
    #[must_use]
    pub fn home(&self) -> &str {
        &self.home
    }

    /// Arguments always passed to this installation.
    #[must_use]
    pub fn default_args(&self) -> Option<&str> {
        self.default_args.as_deref()
    }

    /// Copy of this installation with its home as seen from `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot translate the path.
    pub fn for_node(&self, node: &dyn ExecutionNode) -> std::io::Result<Self> {
        let home = node.translate_home(&self.name, &self.home)?;
        Ok(Self::new(self.name.clone(), home, self.default_args.clone()))
    }

    /// Copy of this installation with variables in its home expanded.
    #[must_use]
    pub fn for_environment(&self, environment: &Variables) -> Self {
        Self::new(
            self.name.clone(),
            expand(&self.home, environment),
            self.default_args.clone(),
        )
    }
}

/// Translate an installation for `node`, then expand `environment` in it.
///
/// # Errors
///
/// Returns an error if the node cannot translate the path.
pub fn resolve(
    installation: &ToolInstallation,
    node: &dyn ExecutionNode,
    environment: &Variables,
) -> std::io::Result<ToolInstallation> {
    Ok(installation.for_node(node)?.for_environment(environment))
}

/// Path of the executable inside `home`.
///
/// When `home` is a directory on the node, `exec_name` is appended with the
/// node's separator; otherwise `home` already names the executable.
///
/// # Errors
///
/// Returns an error if the node cannot be queried.
pub async fn full_executable_path(
    node: &dyn ExecutionNode,
    home: &str,
    exec_name: &str,
) -> std::io::Result<String> {
    if !node.is_directory(home).await? {
        return Ok(home.to_string());
    }

    let mut path = home.to_string();
    if !path.ends_with(['\\', '/']) {
        path.push(node.platform().separator());
    }
    path.push_str(exec_name);
    Ok(path)
}
