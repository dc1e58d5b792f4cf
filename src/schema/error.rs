//! Schema errors: unmet field constraints and malformed schema declarations.

use serde::Serialize;
use thiserror::Error;

use super::data_uri::DataUriError;

/// Field name reported when the value as a whole is not an object.
pub const ROOT_FIELD: &str = "$";

/// A single unmet field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum Constraint {
    #[error("must be a JSON object")]
    NotAnObject,

    #[error("is required")]
    Missing,

    #[error("must be {expected}")]
    WrongType { expected: &'static str },

    #[error("must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("is not a valid data URI: {reason}")]
    DataUri { reason: DataUriError },

    #[error("cannot be decoded into the result type: {message}")]
    Undecodable { message: String },
}

/// The first field of a value that fails its schema, and why.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("field `{field}` {constraint}")]
pub struct Violation {
    pub field: String,
    pub constraint: Constraint,
}

impl Violation {
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }
}

/// Caller-supplied input does not satisfy a capability's input schema.
///
/// Raised before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("invalid input: {0}")]
pub struct ValidationError(pub Violation);

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        &self.0.field
    }

    /// The constraint the field did not meet.
    pub fn constraint(&self) -> &Constraint {
        &self.0.constraint
    }
}

/// A backend response does not match the declared output shape.
///
/// This signals backend or template drift, never a user mistake.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("backend response does not match output schema: {0}")]
pub struct SchemaMismatchError(pub Violation);

impl SchemaMismatchError {
    pub fn field(&self) -> &str {
        &self.0.field
    }

    pub fn constraint(&self) -> &Constraint {
        &self.0.constraint
    }
}

/// A schema declaration that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field name must not be empty")]
    EmptyFieldName,

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
}
