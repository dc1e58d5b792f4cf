//! Capability definition — one prompt-backed operation.
//!
//! A capability binds together:
//! - an input schema the caller's data must satisfy
//! - an output schema the backend's response must satisfy
//! - the prompt template rendered from validated input
//!
//! Definitions are plain data, normally loaded from YAML.

use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use crate::prompts::PromptTemplate;
use crate::schema::{FieldKind, ObjectSchema};

/// A capability definition.
///
/// Example YAML:
/// ```yaml
/// capability:
///   name: "flag_potential_abuse"
///   description: "Flag potential abuse of legal provisions"
///   input:
///     - name: caseDetails
///       type: string
///       min_length: 50
///   output:
///     - name: abuseDetected
///       type: boolean
///     - name: explanation
///       type: string
///   template: |
///     Case Details: {{{caseDetails}}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    /// Unique registry key.
    pub name: String,

    /// Human-readable summary.
    #[serde(default)]
    pub description: String,

    /// Shape of acceptable input.
    pub input: ObjectSchema,

    /// Guaranteed shape of a successful result.
    pub output: ObjectSchema,

    /// Prompt rendered from validated input.
    pub template: PromptTemplate,
}

impl CapabilityDefinition {
    /// Build and check a definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input: ObjectSchema,
        output: ObjectSchema,
        template: PromptTemplate,
    ) -> Result<Self, RegistryError> {
        let definition = Self {
            name: name.into(),
            description: description.into(),
            input,
            output,
            template,
        };
        definition.check()?;
        Ok(definition)
    }

    /// Parse a single definition nested under a `capability:` key.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let wrapper: CapabilityWrapper = serde_yaml::from_str(yaml)?;
        wrapper.capability.check()?;
        Ok(wrapper.capability)
    }

    /// Check that the name, schemas and template agree with each other.
    pub fn check(&self) -> Result<(), RegistryError> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(RegistryError::invalid(
                &self.name,
                "name must be non-empty and contain no whitespace",
            ));
        }

        if self.output.fields().is_empty() {
            return Err(RegistryError::invalid(&self.name, "output schema declares no fields"));
        }

        for field in self.template.text_fields() {
            if self.input.field(field).is_none() {
                return Err(RegistryError::invalid(
                    &self.name,
                    format!("template references undeclared input field `{}`", field),
                ));
            }
        }

        for field in self.template.media_fields() {
            match self.input.field(field).map(|f| &f.kind) {
                Some(FieldKind::DataUri) => {}
                Some(_) => {
                    return Err(RegistryError::invalid(
                        &self.name,
                        format!("media placeholder `{}` must reference a data_uri field", field),
                    ))
                }
                None => {
                    return Err(RegistryError::invalid(
                        &self.name,
                        format!("template references undeclared input field `{}`", field),
                    ))
                }
            }
        }

        Ok(())
    }
}

/// Wrapper for YAML deserialization (definition nested under `capability:`).
#[derive(Debug, Deserialize)]
pub(crate) struct CapabilityWrapper {
    pub(crate) capability: CapabilityDefinition,
}
