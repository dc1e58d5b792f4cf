//! Capability Registry — the explicit table of registered capabilities.
//!
//! The registry is built once at startup from:
//! 1. Built-in capabilities (compiled into the binary)
//! 2. YAML files in an optional definitions directory
//! 3. Programmatically registered definitions
//!
//! and then shared read-only (`Arc<CapabilityRegistry>`) with every invoker.
//! Names are unique: registering a name twice is an error, never an override.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::builtin::builtin_definitions;
use super::capability::{CapabilityDefinition, CapabilityWrapper};
use super::error::RegistryError;

/// Capability definitions indexed by name.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<CapabilityDefinition>>,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the four built-in legal capabilities.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for definition in builtin_definitions()? {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Register a definition.
    pub fn register(&mut self, definition: CapabilityDefinition) -> Result<(), RegistryError> {
        definition.check()?;
        if self.capabilities.contains_key(&definition.name) {
            return Err(RegistryError::Duplicate(definition.name));
        }
        log::debug!("Registered capability '{}'", definition.name);
        self.capabilities
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Register definitions from YAML text.
    ///
    /// The text can contain a single `capability:` or a `capabilities:` list.
    /// Nothing is registered if any definition in the text is rejected.
    pub fn register_yaml(&mut self, yaml: &str) -> Result<usize, RegistryError> {
        let definitions = match serde_yaml::from_str::<CapabilityWrapper>(yaml) {
            Ok(wrapper) => vec![wrapper.capability],
            Err(single_err) => match serde_yaml::from_str::<CapabilityListWrapper>(yaml) {
                Ok(list) => list.capabilities,
                // Report the single-definition error when neither shape fits.
                Err(_) => return Err(single_err.into()),
            },
        };

        for (i, definition) in definitions.iter().enumerate() {
            definition.check()?;
            let repeated = definitions[..i].iter().any(|d| d.name == definition.name);
            if repeated || self.capabilities.contains_key(&definition.name) {
                return Err(RegistryError::Duplicate(definition.name.clone()));
            }
        }

        let count = definitions.len();
        for definition in definitions {
            self.register(definition)?;
        }
        Ok(count)
    }

    /// Register definitions from a YAML file.
    pub fn register_file(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.register_yaml(&content)
    }

    /// Load all `*.yaml` / `*.yml` files under `dir` (recursive, sorted).
    ///
    /// A missing directory loads nothing. The first bad file aborts the load.
    /// Symlinked files are read; symlinked directories are not entered.
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        if !dir.exists() {
            log::warn!("Capability directory {} does not exist", dir.display());
            return Ok(0);
        }

        let io_err = |source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = std::fs::read_dir(dir)
            .map_err(io_err)?
            .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut count = 0;
        for (path, file_type) in entries {
            if file_type.is_dir() {
                count += self.load_directory(&path)?;
            } else if file_type.is_symlink() && path.is_dir() {
                log::debug!("Skipping symlinked directory {}", path.display());
            } else if path
                .extension()
                .map_or(false, |ext| ext == "yaml" || ext == "yml")
            {
                let loaded = self.register_file(&path)?;
                log::info!("Loaded {} capability definition(s) from {}", loaded, path.display());
                count += loaded;
            }
        }
        Ok(count)
    }

    /// Look up a capability by name.
    pub fn get(&self, name: &str) -> Option<&CapabilityDefinition> {
        self.capabilities.get(name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered definitions, sorted by name.
    pub fn list(&self) -> Vec<&CapabilityDefinition> {
        let mut list: Vec<&CapabilityDefinition> =
            self.capabilities.values().map(Arc::as_ref).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

/// Wrapper for YAML list of capabilities
#[derive(Debug, Deserialize)]
struct CapabilityListWrapper {
    capabilities: Vec<CapabilityDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::builtin::{FLAG_POTENTIAL_ABUSE, SUGGEST_RELEVANT_CASE_LAWS};

    const SUMMARIZE_YAML: &str = r#"
capability:
  name: summarize_judgment
  input:
    - name: judgment
      type: string
      min_length: 20
  output:
    - name: summary
      type: string
  template: "Summarize: {{{judgment}}}"
"#;

    const LIST_YAML: &str = r#"
capabilities:
  - name: translate_notice
    input:
      - name: notice
        type: string
        min_length: 1
    output:
      - name: translation
        type: string
    template: "Translate: {{{notice}}}"
  - name: classify_filing
    input:
      - name: filing
        type: string
        min_length: 1
    output:
      - name: category
        type: string
    template: "Classify: {{{filing}}}"
"#;

    #[test]
    fn test_with_builtins() {
        let registry = CapabilityRegistry::with_builtins().unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.names(),
            vec![
                "auto_draft_legal_document",
                "digitize_legal_document",
                "flag_potential_abuse",
                "suggest_relevant_case_laws",
            ]
        );
        assert!(registry.get(FLAG_POTENTIAL_ABUSE).is_some());
        assert!(registry.get("no_such_capability").is_none());
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = CapabilityRegistry::with_builtins().unwrap();
        let duplicate = registry.get(SUGGEST_RELEVANT_CASE_LAWS).unwrap().clone();
        let err = registry.register(duplicate).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == SUGGEST_RELEVANT_CASE_LAWS));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_yaml_single_and_list() {
        let mut registry = CapabilityRegistry::new();
        assert_eq!(registry.register_yaml(SUMMARIZE_YAML).unwrap(), 1);
        assert_eq!(registry.register_yaml(LIST_YAML).unwrap(), 2);
        assert_eq!(
            registry.names(),
            vec!["classify_filing", "summarize_judgment", "translate_notice"]
        );
    }

    #[test]
    fn test_register_yaml_is_all_or_nothing() {
        let mut registry = CapabilityRegistry::new();
        registry.register_yaml(SUMMARIZE_YAML).unwrap();

        let mixed = r#"
capabilities:
  - name: fresh_capability
    input: []
    output:
      - name: ok
        type: boolean
    template: "Say yes."
  - name: summarize_judgment
    input: []
    output:
      - name: ok
        type: boolean
    template: "Say no."
"#;
        assert!(matches!(
            registry.register_yaml(mixed),
            Err(RegistryError::Duplicate(_))
        ));
        assert!(!registry.contains("fresh_capability"));
    }

    #[test]
    fn test_register_yaml_reports_parse_error() {
        let mut registry = CapabilityRegistry::new();
        assert!(matches!(
            registry.register_yaml("capability: [not, a, map]"),
            Err(RegistryError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("summarize.yaml"), SUMMARIZE_YAML).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("more.yml"), LIST_YAML).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a definition").unwrap();

        let mut registry = CapabilityRegistry::with_builtins().unwrap();
        assert_eq!(registry.load_directory(dir.path()).unwrap(), 3);
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_load_directory_missing_is_empty() {
        let mut registry = CapabilityRegistry::new();
        let count = registry
            .load_directory(Path::new("/definitely/not/here"))
            .unwrap();
        assert_eq!(count, 0);
        assert!(registry.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_directory_does_not_follow_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("summarize.yaml"), SUMMARIZE_YAML).unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();
        std::os::unix::fs::symlink(nested.join("summarize.yaml"), dir.path().join("linked.yml"))
            .unwrap();

        let mut registry = CapabilityRegistry::new();
        let err = registry.load_directory(dir.path()).unwrap_err();
        // The symlinked file is read, so the same definition arrives twice.
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "summarize_judgment"));

        std::fs::remove_file(dir.path().join("linked.yml")).unwrap();
        let mut registry = CapabilityRegistry::new();
        assert_eq!(registry.load_directory(dir.path()).unwrap(), 1);
    }

    #[test]
    fn test_load_directory_fails_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "capability: {name: x}").unwrap();
        let mut registry = CapabilityRegistry::new();
        assert!(registry.load_directory(dir.path()).is_err());
    }
}
