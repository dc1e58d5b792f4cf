//! Flow invocation errors.

use thiserror::Error;

use super::invoker::InvocationStage;
use crate::llms::BackendError;
use crate::schema::{SchemaMismatchError, ValidationError};

/// Terminal failure of one invocation.
///
/// None of these are retried by the invoker, and no partial result ever
/// accompanies them.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Caller input failed a field constraint; the backend was not called.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No capability is registered under this name.
    #[error("unknown capability: {name}")]
    UnknownCapability { name: String },

    /// The backend call itself failed.
    #[error("backend call for '{capability}' failed: {source}")]
    Backend {
        capability: String,
        #[source]
        source: BackendError,
    },

    /// The backend answered with something outside the output schema.
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),
}

impl FlowError {
    /// Stable identifier for logs and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "validation",
            FlowError::UnknownCapability { .. } => "unknown_capability",
            FlowError::Backend { .. } => "backend",
            FlowError::SchemaMismatch(_) => "schema_mismatch",
        }
    }

    /// The last stage the invocation reached before failing.
    pub fn stage(&self) -> InvocationStage {
        match self {
            FlowError::Validation(_) | FlowError::UnknownCapability { .. } => {
                InvocationStage::Created
            }
            FlowError::Backend { .. } => InvocationStage::TemplateRendered,
            FlowError::SchemaMismatch(_) => InvocationStage::BackendInvoked,
        }
    }

    /// The offending field, for validation and schema-mismatch errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            FlowError::Validation(e) => Some(e.field()),
            FlowError::SchemaMismatch(e) => Some(e.field()),
            _ => None,
        }
    }

    /// Whether the caller (rather than the backend or the deployment) is at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, FlowError::Validation(_))
    }
}
