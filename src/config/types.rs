//! Configuration types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::build::{StepSettings, DEFAULT_EXEC_NAME};
use crate::process::{OutputCharset, PlatformFamily};
use crate::tool::{InstallationStore, LocalNode, ToolInstallation};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub node: NodeConfig,
    pub installations: Vec<InstallationConfig>,
    pub step: StepConfig,
    /// Extra build variables available to argument expansion.
    pub variables: BTreeMap<String, String>,
}

impl CompileConfig {
    /// Installation store holding every configured installation.
    #[must_use]
    pub fn installation_store(&self) -> InstallationStore {
        InstallationStore::new(
            self.installations
                .iter()
                .map(InstallationConfig::to_installation)
                .collect(),
        )
    }
}

/// The machine the compiler runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub name: String,
    /// Overrides the platform of the current machine.
    pub platform: Option<PlatformFamily>,
    /// Installation name to home directory on this node.
    pub tool_locations: HashMap<String, String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            platform: None,
            tool_locations: HashMap::new(),
        }
    }
}

impl NodeConfig {
    #[must_use]
    pub fn to_node(&self) -> LocalNode {
        LocalNode::new(self.name.clone())
            .with_platform(self.platform.unwrap_or_default())
            .with_tool_locations(self.tool_locations.clone())
    }
}

/// One named pbc installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationConfig {
    pub name: String,
    pub home: String,
    #[serde(default)]
    pub default_args: Option<String>,
}

impl InstallationConfig {
    #[must_use]
    pub fn to_installation(&self) -> ToolInstallation {
        ToolInstallation::new(self.name.clone(), self.home.clone(), self.default_args.clone())
    }
}

/// Step defaults, overridden by command line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub exec_name: String,
    pub installation: Option<String>,
    pub cmd_line_args: String,
    pub continue_on_build_failure: bool,
    pub unstable_if_warnings: bool,
    /// Charset the compiler writes its output in.
    pub charset: Option<String>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            exec_name: DEFAULT_EXEC_NAME.to_string(),
            installation: None,
            cmd_line_args: String::new(),
            continue_on_build_failure: false,
            unstable_if_warnings: false,
            charset: None,
        }
    }
}

impl StepConfig {
    #[must_use]
    pub fn to_settings(&self) -> StepSettings {
        StepSettings {
            exec_name: self.exec_name.clone(),
            installation: self.installation.clone(),
            cmd_line_args: self.cmd_line_args.clone(),
            continue_on_build_failure: self.continue_on_build_failure,
            unstable_if_warnings: self.unstable_if_warnings,
        }
    }

    /// Output charset, UTF-8 when unset.
    #[must_use]
    pub fn output_charset(&self) -> OutputCharset {
        self.charset
            .as_deref()
            .map_or_else(OutputCharset::utf8, OutputCharset::new)
    }
}
