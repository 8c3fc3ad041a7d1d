//! Execution nodes the compiler can run on.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::process::PlatformFamily;

/// A machine that runs build steps.
///
/// Nodes translate installation homes to their local layout and answer
/// filesystem queries about the resolved paths.
#[async_trait]
pub trait ExecutionNode: Send + Sync {
    /// Node name, for logs.
    fn name(&self) -> &str;

    /// Platform family of the node.
    fn platform(&self) -> PlatformFamily;

    /// Translate the home of the installation called `installation` to
    /// where it lives on this node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be asked about its tool layout.
    fn translate_home(&self, installation: &str, home: &str) -> std::io::Result<String>;

    /// Whether `path` exists on the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself fails.
    async fn exists(&self, path: &str) -> std::io::Result<bool>;

    /// Whether `path` is a directory on the node. Missing paths are not.
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself fails.
    async fn is_directory(&self, path: &str) -> std::io::Result<bool>;
}

/// The machine this process runs on.
#[derive(Debug, Clone)]
pub struct LocalNode {
    name: String,
    platform: PlatformFamily,
    tool_locations: HashMap<String, String>,
}

impl Default for LocalNode {
    fn default() -> Self {
        Self::new("local")
    }
}

impl LocalNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: PlatformFamily::current(),
            tool_locations: HashMap::new(),
        }
    }

    /// Override the platform family, for nodes reached through a shared
    /// filesystem.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformFamily) -> Self {
        self.platform = platform;
        self
    }

    /// Install location overrides, keyed by installation name.
    #[must_use]
    pub fn with_tool_locations(mut self, locations: HashMap<String, String>) -> Self {
        self.tool_locations = locations;
        self
    }
}

#[async_trait]
impl ExecutionNode for LocalNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> PlatformFamily {
        self.platform
    }

    fn translate_home(&self, installation: &str, home: &str) -> std::io::Result<String> {
        match self.tool_locations.get(installation) {
            Some(location) => {
                tracing::debug!(
                    node = %self.name,
                    installation,
                    location = %location,
                    "Using node tool location"
                );
                Ok(location.clone())
            }
            None => Ok(home.to_string()),
        }
    }

    async fn exists(&self, path: &str) -> std::io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn is_directory(&self, path: &str) -> std::io::Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
