//! The Flow Invoker: one linear pass per call.
//!
//! ```text
//! Created -> InputValidated -> TemplateRendered -> BackendInvoked -> OutputValidated
//!    \              \                  \                  \
//!     `--------------`------------------`------------------`--> Failed
//! ```
//!
//! The backend await is the only suspension point. The invoker holds no
//! mutable state, enforces no timeout and never retries; dropping the future
//! abandons the call.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::error::FlowError;
use crate::capabilities::CapabilityRegistry;
use crate::llms::GenerativeBackend;
use crate::schema::{Constraint, SchemaMismatchError, ValidatedOutput, Violation, ROOT_FIELD};

/// Progress of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStage {
    Created,
    InputValidated,
    TemplateRendered,
    BackendInvoked,
    OutputValidated,
    Failed,
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvocationStage::Created => "created",
            InvocationStage::InputValidated => "input_validated",
            InvocationStage::TemplateRendered => "template_rendered",
            InvocationStage::BackendInvoked => "backend_invoked",
            InvocationStage::OutputValidated => "output_validated",
            InvocationStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs capabilities from a registry against a generative backend.
///
/// Cheap to clone; clones share the registry and backend.
#[derive(Debug, Clone)]
pub struct FlowInvoker {
    registry: Arc<CapabilityRegistry>,
    backend: Arc<dyn GenerativeBackend>,
}

impl FlowInvoker {
    pub fn new(registry: Arc<CapabilityRegistry>, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Invoke `capability` with untrusted `raw_input`.
    ///
    /// Returns output that satisfies the capability's output schema, or one
    /// of the four [`FlowError`] kinds.
    pub async fn invoke(
        &self,
        capability: &str,
        raw_input: &Value,
    ) -> Result<ValidatedOutput, FlowError> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "invoke",
            capability = %capability,
            invocation_id = %invocation_id,
            backend = %self.backend.name(),
        );

        async move {
            let result = self.run(capability, raw_input).await;
            match &result {
                Ok(_) => tracing::info!("invocation succeeded"),
                Err(err) if err.is_caller_error() => tracing::info!(
                    kind = err.kind(),
                    stage = %err.stage(),
                    field = err.field().unwrap_or_default(),
                    "invocation rejected: {}",
                    err
                ),
                Err(err) => tracing::warn!(
                    kind = err.kind(),
                    stage = %err.stage(),
                    "invocation failed: {}",
                    err
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Invoke and decode the validated output into `T`.
    pub async fn invoke_as<T: DeserializeOwned>(
        &self,
        capability: &str,
        raw_input: &Value,
    ) -> Result<T, FlowError> {
        let output = self.invoke(capability, raw_input).await?;
        output.deserialize().map_err(|e| {
            FlowError::SchemaMismatch(SchemaMismatchError(Violation::new(
                ROOT_FIELD,
                Constraint::Undecodable {
                    message: e.to_string(),
                },
            )))
        })
    }

    async fn run(&self, capability: &str, raw_input: &Value) -> Result<ValidatedOutput, FlowError> {
        let definition =
            self.registry
                .get(capability)
                .ok_or_else(|| FlowError::UnknownCapability {
                    name: capability.to_string(),
                })?;
        trace_stage(InvocationStage::Created);

        let input = definition.input.validate_input(raw_input)?;
        trace_stage(InvocationStage::InputValidated);

        let prompt = definition.template.render(&input);
        tracing::debug!(
            stage = %InvocationStage::TemplateRendered,
            parts = prompt.parts().len(),
            media = prompt.media().count(),
            "prompt rendered"
        );

        let output_schema = definition.output.to_json_schema();
        let raw_output = self
            .backend
            .generate(&prompt, &output_schema)
            .await
            .map_err(|source| FlowError::Backend {
                capability: definition.name.clone(),
                source,
            })?;
        trace_stage(InvocationStage::BackendInvoked);

        let output = definition.output.validate_output(&raw_output)?;
        trace_stage(InvocationStage::OutputValidated);

        Ok(output)
    }
}

fn trace_stage(stage: InvocationStage) {
    tracing::debug!(stage = %stage, "stage reached");
}
