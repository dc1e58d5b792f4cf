//! The four built-in legal capabilities, compiled in from YAML.

use super::capability::CapabilityDefinition;
use super::error::RegistryError;

pub const DIGITIZE_LEGAL_DOCUMENT: &str = "digitize_legal_document";
pub const SUGGEST_RELEVANT_CASE_LAWS: &str = "suggest_relevant_case_laws";
pub const FLAG_POTENTIAL_ABUSE: &str = "flag_potential_abuse";
pub const AUTO_DRAFT_LEGAL_DOCUMENT: &str = "auto_draft_legal_document";

const BUILTIN_YAML: &[(&str, &str)] = &[
    (
        DIGITIZE_LEGAL_DOCUMENT,
        include_str!("definitions/digitize_legal_document.yaml"),
    ),
    (
        SUGGEST_RELEVANT_CASE_LAWS,
        include_str!("definitions/suggest_relevant_case_laws.yaml"),
    ),
    (
        FLAG_POTENTIAL_ABUSE,
        include_str!("definitions/flag_potential_abuse.yaml"),
    ),
    (
        AUTO_DRAFT_LEGAL_DOCUMENT,
        include_str!("definitions/auto_draft_legal_document.yaml"),
    ),
];

/// Parse the built-in definitions.
pub fn builtin_definitions() -> Result<Vec<CapabilityDefinition>, RegistryError> {
    BUILTIN_YAML
        .iter()
        .map(|(name, yaml)| {
            let def = CapabilityDefinition::from_yaml(yaml)?;
            if def.name != *name {
                return Err(RegistryError::invalid(
                    name,
                    format!("definition file declares name '{}'", def.name),
                ));
            }
            Ok(def)
        })
        .collect()
}
