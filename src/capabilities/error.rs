//! Capability registry errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building capability definitions or a registry.
///
/// These happen at startup; an invocation never produces one.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// YAML parsing failed (includes malformed schemas and templates).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A definition file could not be read.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A capability with this name is already registered.
    #[error("capability already registered: {0}")]
    Duplicate(String),

    /// A definition is internally inconsistent.
    #[error("invalid capability '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

impl RegistryError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
