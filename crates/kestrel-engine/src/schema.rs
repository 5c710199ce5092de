//! Declarative argument schemas and the validator that enforces them.
//!
//! Validation never stops at the first problem: every field is checked and
//! all violations are returned together, so a caller can fix its input in one
//! round trip.

use serde_json::{Map, Value, json};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    /// A string restricted to a fixed set of literals.
    OneOf(&'static [&'static str]),
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::OneOf(_) => "string",
            FieldKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn check(&self, value: &Value) -> Option<Violation> {
        match (self.kind, value) {
            (FieldKind::Boolean, Value::Bool(_)) | (FieldKind::String, Value::String(_)) => None,
            (FieldKind::OneOf(allowed), Value::String(s)) => {
                if allowed.contains(&s.as_str()) {
                    None
                } else {
                    Some(Violation::NotAllowed {
                        field: self.name.to_string(),
                        value: s.clone(),
                        allowed: allowed.to_vec(),
                    })
                }
            }
            (kind, other) => Some(Violation::WrongType {
                field: self.name.to_string(),
                expected: kind.expected(),
                found: json_type(other),
            }),
        }
    }

    fn json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.kind.expected()));
        prop.insert("description".into(), json!(self.description));
        if let FieldKind::OneOf(allowed) = self.kind {
            prop.insert("enum".into(), json!(allowed));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        Value::Object(prop)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    pub fields: Vec<FieldSpec>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Check `args` against every field and return the normalized object.
    ///
    /// Absent or `null` arguments are treated as an empty object. Optional
    /// fields that are absent receive their declared default, if any. Fields
    /// the schema does not declare are dropped.
    pub fn validate(&self, tool: &str, args: &Value) -> Result<Map<String, Value>, ValidationError> {
        let empty = Map::new();
        let object = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ValidationError {
                    tool: tool.to_string(),
                    violations: vec![Violation::NotAnObject {
                        found: json_type(other),
                    }],
                });
            }
        };

        let mut normalized = Map::new();
        let mut violations = Vec::new();

        for spec in &self.fields {
            match object.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => match spec.check(value) {
                    Some(violation) => violations.push(violation),
                    None => {
                        normalized.insert(spec.name.to_string(), value.clone());
                    }
                },
                None if spec.required => violations.push(Violation::Missing {
                    field: spec.name.to_string(),
                }),
                None => {
                    if let Some(default) = &spec.default {
                        normalized.insert(spec.name.to_string(), default.clone());
                    }
                }
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|f| f.name == key) {
                tracing::debug!(tool, field = %key, "Ignoring undeclared argument");
            }
        }

        if violations.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidationError {
                tool: tool.to_string(),
                violations,
            })
        }
    }

    /// JSON Schema describing the accepted argument object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing {
        field: String,
    },
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<&'static str>,
    },
    NotAnObject {
        found: &'static str,
    },
}

impl Violation {
    pub fn field(&self) -> Option<&str> {
        match self {
            Violation::Missing { field }
            | Violation::WrongType { field, .. }
            | Violation::NotAllowed { field, .. } => Some(field),
            Violation::NotAnObject { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing { field } => write!(f, "missing required field '{}'", field),
            Violation::WrongType {
                field,
                expected,
                found,
            } => write!(f, "field '{}' must be a {}, got {}", field, expected, found),
            Violation::NotAllowed {
                field,
                value,
                allowed,
            } => write!(
                f,
                "field '{}' must be one of [{}], got {:?}",
                field,
                allowed.join(", "),
                value
            ),
            Violation::NotAnObject { found } => {
                write!(f, "arguments must be an object, got {}", found)
            }
        }
    }
}

/// Every contract violation found in one argument object.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Invalid arguments for '{tool}': {}", join_violations(.violations))]
pub struct ValidationError {
    pub tool: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().filter_map(Violation::field).collect()
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teach_like() -> ArgumentSchema {
        ArgumentSchema::new()
            .field(FieldSpec::required("description", FieldKind::String, "what"))
            .field(FieldSpec::required("target", FieldKind::String, "where"))
            .field(FieldSpec::optional("notes", FieldKind::String, "why"))
    }

    #[test]
    fn test_reports_every_missing_field() {
        let err = teach_like().validate("teach", &json!({})).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert_eq!(err.fields(), vec!["description", "target"]);
        let msg = err.to_string();
        assert!(msg.contains("'description'"));
        assert!(msg.contains("'target'"));
    }

    #[test]
    fn test_mixed_violations_are_collected() {
        let schema = teach_like().field(FieldSpec::optional(
            "format",
            FieldKind::OneOf(&["png", "jpeg"]),
            "fmt",
        ));
        let err = schema
            .validate(
                "teach",
                &json!({ "description": 7, "notes": true, "format": "gif" }),
            )
            .unwrap_err();
        assert_eq!(err.violations.len(), 4);
        assert!(err.violations.contains(&Violation::WrongType {
            field: "description".into(),
            expected: "string",
            found: "number",
        }));
        assert!(err.violations.contains(&Violation::Missing {
            field: "target".into()
        }));
        assert!(err.to_string().contains("must be one of [png, jpeg]"));
    }

    #[test]
    fn test_boolean_default_applied() {
        let schema = ArgumentSchema::new().field(
            FieldSpec::optional("includeHidden", FieldKind::Boolean, "hidden")
                .with_default(json!(false)),
        );
        let normalized = schema.validate("enumerate", &Value::Null).unwrap();
        assert_eq!(normalized.get("includeHidden"), Some(&json!(false)));
    }

    #[test]
    fn test_optional_without_default_stays_absent() {
        let normalized = teach_like()
            .validate("teach", &json!({ "description": "d", "target": "t", "notes": null }))
            .unwrap();
        assert!(!normalized.contains_key("notes"));
    }

    #[test]
    fn test_non_object_arguments() {
        let err = teach_like().validate("teach", &json!([1, 2])).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::NotAnObject { found: "array" }]
        );
    }

    #[test]
    fn test_undeclared_fields_dropped() {
        let normalized = teach_like()
            .validate(
                "teach",
                &json!({ "description": "d", "target": "t", "extra": 1 }),
            )
            .unwrap();
        assert!(!normalized.contains_key("extra"));
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = teach_like().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["description", "target"]));
        assert_eq!(schema["properties"]["notes"]["type"], "string");
    }
}
