//! # Capabilities
//!
//! A capability is a named contract: an input schema, an output schema and
//! the prompt template that turns validated input into a backend request.
//! Definitions are plain YAML:
//!
//! ```yaml
//! capability:
//!   name: flag_potential_abuse
//!   input:
//!     - name: caseDetails
//!       type: string
//!       min_length: 50
//!   output:
//!     - name: abuseDetected
//!       type: boolean
//!   template: "Case Details: {{{caseDetails}}}"
//! ```
//!
//! The four legal capabilities ship compiled in (see [`builtin`]); extra
//! definitions can be loaded from a directory at startup. [`legal`] wraps the
//! built-ins in typed request/response structs.

pub mod builtin;
pub mod capability;
pub mod error;
pub mod legal;
pub mod registry;

pub use capability::CapabilityDefinition;
pub use error::RegistryError;
pub use legal::{FlowInput, LegalAssistant};
pub use registry::CapabilityRegistry;
