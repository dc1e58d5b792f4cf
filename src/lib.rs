//! # lexflow
//!
//! Schema-validated prompt flows for a legal-workflow assistant.
//!
//! Four capabilities ship built in: digitizing scanned documents, suggesting
//! relevant case laws, flagging potential abuse of legal provisions, and
//! auto-drafting legal documents. Each one is a [`CapabilityDefinition`]: an
//! input schema, an output schema and a prompt template. The [`FlowInvoker`]
//! validates input, renders the prompt, makes one call to a
//! [`GenerativeBackend`] and validates the result before returning it.

pub mod capabilities;
pub mod config;
pub mod flow;
pub mod llms;
pub mod prompts;
pub mod schema;
pub mod server;

pub use capabilities::{CapabilityDefinition, CapabilityRegistry, LegalAssistant, RegistryError};
pub use config::{ConfigError, ServerConfig};
pub use flow::{FlowError, FlowInvoker, InvocationStage};
pub use llms::{BackendError, GeminiBackend, GeminiConfig, GenerativeBackend};
pub use prompts::{PromptTemplate, RenderedPrompt};
pub use schema::{ObjectSchema, SchemaMismatchError, ValidatedInput, ValidatedOutput, ValidationError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
