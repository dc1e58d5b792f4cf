//! # Flow Invoker
//!
//! Runs a named capability end to end: look up the definition, validate the
//! caller's input, render the prompt, call the generative backend once and
//! validate what comes back.
//!
//! ```rust,ignore
//! let registry = Arc::new(CapabilityRegistry::with_builtins()?);
//! let invoker = FlowInvoker::new(registry, Arc::new(GeminiBackend::new(config)?));
//! let output = invoker.invoke("flag_potential_abuse", &input).await?;
//! ```

pub mod error;
pub mod invoker;

pub use error::FlowError;
pub use invoker::{FlowInvoker, InvocationStage};
