//! Generative backends.
//!
//! [`GenerativeBackend`] is the single external dependency of the flow layer.
//! [`gemini::GeminiBackend`] is the production implementation.

pub mod backend;
pub mod gemini;

#[cfg(test)]
pub(crate) mod scripted;

pub use backend::{BackendError, GenerativeBackend};
pub use gemini::{GeminiBackend, GeminiConfig};
