//! Configured installation set.

use std::sync::{Arc, PoisonError, RwLock};

use super::installation::ToolInstallation;

/// No installation with the requested name is configured.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("No pbc installation named '{0}' is configured")]
pub struct InstallationNotFoundError(pub String);

/// Holds the configured installations.
///
/// Readers get an immutable snapshot; writers replace the whole list at
/// once, so a reader never sees a half-updated set.
#[derive(Debug)]
pub struct InstallationStore {
    installations: RwLock<Arc<[ToolInstallation]>>,
}

impl Default for InstallationStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InstallationStore {
    #[must_use]
    pub fn new(installations: Vec<ToolInstallation>) -> Self {
        Self {
            installations: RwLock::new(Arc::from(installations)),
        }
    }

    /// Snapshot of the installations, in configuration order.
    #[must_use]
    pub fn installations(&self) -> Arc<[ToolInstallation]> {
        Arc::clone(&self.installations.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace every installation.
    pub fn replace_all(&self, installations: Vec<ToolInstallation>) {
        let snapshot: Arc<[ToolInstallation]> = Arc::from(installations);
        tracing::debug!(count = snapshot.len(), "Replacing configured installations");
        *self.installations.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Find an installation by exact, case-sensitive name.
    ///
    /// # Errors
    ///
    /// Returns `InstallationNotFoundError` if no installation has that name.
    pub fn find(&self, name: &str) -> Result<ToolInstallation, InstallationNotFoundError> {
        self.installations()
            .iter()
            .find(|installation| installation.name() == name)
            .cloned()
            .ok_or_else(|| InstallationNotFoundError(name.to_string()))
    }
}
