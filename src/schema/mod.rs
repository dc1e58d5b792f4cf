//! # Schema contracts
//!
//! Structural descriptions of the data crossing the flow boundary, in both
//! directions: caller input going to the generative backend, and backend
//! output coming back.
//!
//! A schema is an ordered list of [`FieldSpec`]s interpreted by one generic
//! checker. The same checker backs [`ObjectSchema::validate_input`] and
//! [`ObjectSchema::validate_output`]; only the error type differs, so that a
//! user mistake and a misbehaving backend stay distinguishable.
//!
//! Schemas are usually declared in YAML alongside a capability:
//!
//! ```yaml
//! - name: caseDetails
//!   type: string
//!   min_length: 50
//! - name: relevantLaws
//!   type: optional_string
//! - name: abuseDetected
//!   type: boolean
//! ```

pub mod data_uri;
pub mod error;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub use data_uri::{DataUri, DataUriError, DATA_URI_PREFIX};
pub use error::{
    Constraint, SchemaError, SchemaMismatchError, ValidationError, Violation, ROOT_FIELD,
};

// ---------------------------------------------------------------------------
// Field declarations
// ---------------------------------------------------------------------------

/// The semantic type of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Required string with at least `min_length` characters.
    String {
        #[serde(default)]
        min_length: usize,
    },
    /// String that may be omitted. Absent and `""` are different values.
    OptionalString,
    /// Required `data:<mime>;base64,<payload>` string.
    DataUri,
    /// Required boolean.
    Boolean,
    /// Required array of strings; may be empty.
    StringArray,
}

impl FieldKind {
    pub fn is_required(&self) -> bool {
        !matches!(self, FieldKind::OptionalString)
    }

    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String { .. } | FieldKind::OptionalString | FieldKind::DataUri => "a string",
            FieldKind::Boolean => "a boolean",
            FieldKind::StringArray => "an array of strings",
        }
    }

    /// Check a present, possibly-null value against this kind.
    fn check(&self, value: &Value) -> Result<(), Constraint> {
        let wrong_type = || Constraint::WrongType {
            expected: self.expected(),
        };

        match self {
            FieldKind::String { min_length } => {
                let s = value.as_str().ok_or_else(wrong_type)?;
                let actual = s.chars().count();
                if actual < *min_length {
                    return Err(Constraint::TooShort {
                        min: *min_length,
                        actual,
                    });
                }
                Ok(())
            }
            FieldKind::OptionalString => value.as_str().map(|_| ()).ok_or_else(wrong_type),
            FieldKind::DataUri => {
                let s = value.as_str().ok_or_else(wrong_type)?;
                DataUri::parse(s)
                    .map(|_| ())
                    .map_err(|reason| Constraint::DataUri { reason })
            }
            FieldKind::Boolean => value.as_bool().map(|_| ()).ok_or_else(wrong_type),
            FieldKind::StringArray => {
                let items = value.as_array().ok_or_else(wrong_type)?;
                if items.iter().all(Value::is_string) {
                    Ok(())
                } else {
                    Err(wrong_type())
                }
            }
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            FieldKind::String { min_length } if *min_length > 0 => {
                json!({ "type": "string", "minLength": min_length })
            }
            FieldKind::String { .. } | FieldKind::OptionalString => json!({ "type": "string" }),
            FieldKind::DataUri => json!({
                "type": "string",
                "pattern": "^data:[^;,]+/[^;,]+(;[^,]*)?;base64,.+",
            }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }
}

/// One declared field of an object schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ObjectSchema
// ---------------------------------------------------------------------------

/// An ordered set of uniquely named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct ObjectSchema {
    fields: Vec<FieldSpec>,
}

impl TryFrom<Vec<FieldSpec>> for ObjectSchema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldSpec>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<ObjectSchema> for Vec<FieldSpec> {
    fn from(schema: ObjectSchema) -> Self {
        schema.fields
    }
}

impl ObjectSchema {
    /// Build a schema, rejecting empty or repeated field names.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        for (i, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check `raw` field by field, in declaration order.
    ///
    /// Returns the declared fields that were present; undeclared keys are
    /// dropped. Fails on the first violation.
    pub fn check(&self, raw: &Value) -> Result<Map<String, Value>, Violation> {
        let object = raw
            .as_object()
            .ok_or_else(|| Violation::new(ROOT_FIELD, Constraint::NotAnObject))?;

        let mut accepted = Map::new();
        for spec in &self.fields {
            let value = match object.get(&spec.name) {
                None | Some(Value::Null) if spec.kind.is_required() => {
                    return Err(Violation::new(&spec.name, Constraint::Missing));
                }
                None => continue,
                Some(value) => value,
            };
            spec.kind
                .check(value)
                .map_err(|constraint| Violation::new(&spec.name, constraint))?;
            accepted.insert(spec.name.clone(), value.clone());
        }
        Ok(accepted)
    }

    /// Validate caller input.
    pub fn validate_input(&self, raw: &Value) -> Result<ValidatedInput, ValidationError> {
        self.check(raw).map(ValidatedInput).map_err(ValidationError)
    }

    /// Validate a backend response.
    pub fn validate_output(&self, raw: &Value) -> Result<ValidatedOutput, SchemaMismatchError> {
        self.check(raw)
            .map(ValidatedOutput)
            .map_err(SchemaMismatchError)
    }

    /// Render this schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            let mut prop = spec.kind.json_schema();
            if let Some(desc) = &spec.description {
                prop["description"] = Value::String(desc.clone());
            }
            properties.insert(spec.name.clone(), prop);
            if spec.kind.is_required() {
                required.push(Value::String(spec.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// ---------------------------------------------------------------------------
// Validated values
// ---------------------------------------------------------------------------

/// Input that satisfied an input schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedInput(Map<String, Value>);

impl ValidatedInput {
    /// String value of a field, `None` when absent.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Backend output that satisfied an output schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedOutput(Map<String, Value>);

impl ValidatedOutput {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Deserialize into a typed output struct.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value())
    }
}
