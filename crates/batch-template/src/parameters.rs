/*
 * parameters.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parameter declarations and resolution.
//!
//! A template declares its inputs under `parameters`:
//!
//! ```json
//! {
//!   "parameters": {
//!     "vmSize": { "type": "string", "defaultValue": "STANDARD_D1_V2" },
//!     "nodeCount": { "type": "int", "minValue": 1, "maxValue": 100 },
//!     "os": { "type": "string", "allowedValues": ["linux", "windows"] }
//!   }
//! }
//! ```
//!
//! Resolution merges these declarations with caller-supplied values into a
//! [`ResolvedParameters`] table. Supplied values are coerced to the declared
//! type and checked against the declared constraints. A parameter with no
//! value and no default stays unresolved; it is only an error if the body
//! references it.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// Declared type of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ParameterType {
    String,
    SecureString,
    Int,
    Bool,
    Object,
    Array,
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ParameterType::String),
            "securestring" => Ok(ParameterType::SecureString),
            "int" => Ok(ParameterType::Int),
            "bool" => Ok(ParameterType::Bool),
            "object" => Ok(ParameterType::Object),
            "array" => Ok(ParameterType::Array),
            _ => Err(format!("unknown parameter type '{}'", s)),
        }
    }
}

impl TryFrom<String> for ParameterType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::String => "string",
            ParameterType::SecureString => "secureString",
            ParameterType::Int => "int",
            ParameterType::Bool => "bool",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
        };
        f.write_str(name)
    }
}

/// One entry of a template's `parameters` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDeclaration {
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default)]
    pub min_value: Option<i64>,
    #[serde(default)]
    pub max_value: Option<i64>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl ParameterDeclaration {
    /// A declaration with only a type.
    pub fn new(parameter_type: ParameterType) -> Self {
        Self {
            parameter_type,
            default_value: None,
            allowed_values: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            metadata: None,
        }
    }

    /// Coerce a supplied value to the declared type and check constraints.
    pub fn validate(&self, name: &str, value: &Value) -> TemplateResult<Value> {
        let invalid = |reason: String| TemplateError::InvalidParameterValue {
            name: name.to_string(),
            value: self.describe(value),
            reason,
        };

        let coerced = coerce(self.parameter_type, value).ok_or_else(|| {
            invalid(format!(
                "expected a value of type {}, found {}",
                self.parameter_type,
                json_type_name(value)
            ))
        })?;

        if let Some(allowed) = &self.allowed_values {
            if !allowed.contains(&coerced) {
                let listed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(invalid(format!(
                    "value is not one of the allowed values [{}]",
                    listed.join(", ")
                )));
            }
        }

        if let Some(n) = coerced.as_i64() {
            if let Some(min) = self.min_value {
                if n < min {
                    return Err(invalid(format!("value is less than minValue {}", min)));
                }
            }
            if let Some(max) = self.max_value {
                if n > max {
                    return Err(invalid(format!("value is greater than maxValue {}", max)));
                }
            }
        }

        let length = match &coerced {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(length) = length {
            if let Some(min) = self.min_length {
                if length < min {
                    return Err(invalid(format!(
                        "length {} is less than minLength {}",
                        length, min
                    )));
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    return Err(invalid(format!(
                        "length {} is greater than maxLength {}",
                        length, max
                    )));
                }
            }
        }

        Ok(coerced)
    }

    /// How a value appears in error messages. Secure strings are never echoed.
    fn describe(&self, value: &Value) -> String {
        match self.parameter_type {
            ParameterType::SecureString => "<redacted>".to_string(),
            _ => value.to_string(),
        }
    }
}

fn coerce(parameter_type: ParameterType, value: &Value) -> Option<Value> {
    match (parameter_type, value) {
        (ParameterType::String | ParameterType::SecureString, Value::String(_)) => {
            Some(value.clone())
        }
        (ParameterType::String | ParameterType::SecureString, Value::Number(n)) => {
            Some(Value::String(n.to_string()))
        }
        (ParameterType::String | ParameterType::SecureString, Value::Bool(b)) => {
            Some(Value::String(b.to_string()))
        }
        (ParameterType::Int, Value::Number(n)) => n.as_i64().map(Value::from),
        (ParameterType::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (ParameterType::Bool, Value::Bool(_)) => Some(value.clone()),
        (ParameterType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (ParameterType::Object, Value::Object(_)) => Some(value.clone()),
        (ParameterType::Array, Value::Array(_)) => Some(value.clone()),
        _ => None,
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The declarations of a template, in template order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDeclarations {
    declarations: IndexMap<String, ParameterDeclaration>,
}

impl ParameterDeclarations {
    /// Read the `parameters` section of a template. A missing section means
    /// no parameters.
    pub fn from_template(template: &Map<String, Value>) -> TemplateResult<Self> {
        let section = match template.get("parameters") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(section)) => section,
            Some(other) => {
                return Err(TemplateError::invalid_template(format!(
                    "'parameters' must be an object, found {}",
                    json_type_name(other)
                )));
            }
        };

        let mut declarations = IndexMap::with_capacity(section.len());
        for (name, raw) in section {
            let declaration = ParameterDeclaration::deserialize(raw).map_err(|e| {
                TemplateError::invalid_template(format!(
                    "Invalid declaration for parameter '{}': {}",
                    name, e
                ))
            })?;
            declarations.insert(name.clone(), declaration);
        }
        Ok(Self { declarations })
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Merge the declarations with supplied values.
    ///
    /// Undeclared supplied values are ignored. Declared parameters with
    /// neither a value nor a default are kept as unresolved.
    pub fn resolve(&self, supplied: &Map<String, Value>) -> TemplateResult<ResolvedParameters> {
        for name in supplied.keys() {
            if !self.declarations.contains_key(name) {
                debug!(parameter = %name, "ignoring value for undeclared parameter");
            }
        }

        let mut entries = IndexMap::with_capacity(self.declarations.len());
        for (name, declaration) in &self.declarations {
            let value = match supplied.get(name) {
                Some(value) => Some(declaration.validate(name, value)?),
                None => declaration.default_value.clone(),
            };
            entries.insert(name.clone(), value);
        }
        Ok(ResolvedParameters { entries })
    }
}

/// Extract supplied values from a parameter-values document.
///
/// Accepts both `{ "name": { "value": v } }` and bare `{ "name": v }`
/// entries, and unwraps a deployment parameters file
/// (`{ "$schema": ..., "parameters": { ... } }`).
pub fn supplied_values(document: &Value) -> TemplateResult<Map<String, Value>> {
    let entries = match document {
        Value::Null => return Ok(Map::new()),
        Value::Object(map) => match (map.get("$schema"), map.get("parameters")) {
            (Some(_), Some(Value::Object(inner))) => inner,
            _ => map,
        },
        other => {
            return Err(TemplateError::invalid_template(format!(
                "Parameter values must be a JSON object, found {}",
                json_type_name(other)
            )));
        }
    };

    Ok(entries
        .iter()
        .map(|(name, entry)| {
            let value = match entry {
                Value::Object(wrapper) if wrapper.contains_key("value") => wrapper["value"].clone(),
                other => other.clone(),
            };
            (name.clone(), value)
        })
        .collect())
}

/// Outcome of looking a name up in [`ResolvedParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterLookup<'a> {
    Resolved(&'a Value),
    Unresolved,
    Undeclared,
}

/// Parameter table consumed by the evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParameters {
    entries: IndexMap<String, Option<Value>>,
}

impl ResolvedParameters {
    pub fn lookup(&self, name: &str) -> ParameterLookup<'_> {
        match self.entries.get(name) {
            Some(Some(value)) => ParameterLookup::Resolved(value),
            Some(None) => ParameterLookup::Unresolved,
            None => ParameterLookup::Undeclared,
        }
    }

    /// Names of declared parameters that have no value.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn declarations(section: Value) -> ParameterDeclarations {
        let template = json!({ "parameters": section });
        ParameterDeclarations::from_template(template.as_object().unwrap()).unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_parameter_type_is_case_insensitive() {
        assert_eq!(
            "secureString".parse::<ParameterType>(),
            Ok(ParameterType::SecureString)
        );
        assert_eq!(
            "SECURESTRING".parse::<ParameterType>(),
            Ok(ParameterType::SecureString)
        );
        assert_eq!("Int".parse::<ParameterType>(), Ok(ParameterType::Int));
        assert!("float".parse::<ParameterType>().is_err());
    }

    #[test]
    fn test_unknown_type_is_invalid_template() {
        let template = json!({ "parameters": { "x": { "type": "float" } } });
        let err = ParameterDeclarations::from_template(template.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
        assert!(err.to_string().contains("parameter 'x'"));
    }

    #[test]
    fn test_missing_parameters_section() {
        let template = json!({ "pool": {} });
        let decls = ParameterDeclarations::from_template(template.as_object().unwrap()).unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn test_default_fallback() {
        let decls = declarations(json!({ "vmSize": { "type": "string", "defaultValue": "x" } }));
        let resolved = decls.resolve(&Map::new()).unwrap();
        assert_eq!(resolved.lookup("vmSize"), ParameterLookup::Resolved(&json!("x")));
    }

    #[test]
    fn test_supplied_value_overrides_default() {
        let decls = declarations(json!({ "vmSize": { "type": "string", "defaultValue": "x" } }));
        let resolved = decls.resolve(&object(json!({ "vmSize": "y" }))).unwrap();
        assert_eq!(resolved.lookup("vmSize"), ParameterLookup::Resolved(&json!("y")));
    }

    #[test]
    fn test_unresolved_and_undeclared() {
        let decls = declarations(json!({ "a": { "type": "string" } }));
        let resolved = decls.resolve(&object(json!({ "extra": 1 }))).unwrap();
        assert_eq!(resolved.lookup("a"), ParameterLookup::Unresolved);
        assert_eq!(resolved.lookup("extra"), ParameterLookup::Undeclared);
        assert_eq!(resolved.unresolved().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_allowed_values_enforced() {
        let decls = declarations(json!({ "os": { "type": "string", "allowedValues": ["a", "b"] } }));
        let err = decls.resolve(&object(json!({ "os": "c" }))).unwrap_err();
        match err {
            TemplateError::InvalidParameterValue { name, value, reason } => {
                assert_eq!(name, "os");
                assert_eq!(value, "\"c\"");
                assert!(reason.contains("allowed values"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_allowed_values_compare_coerced_value() {
        let decls = declarations(json!({ "n": { "type": "int", "allowedValues": [1, 2] } }));
        let resolved = decls.resolve(&object(json!({ "n": "2" }))).unwrap();
        assert_eq!(resolved.lookup("n"), ParameterLookup::Resolved(&json!(2)));
    }

    #[test]
    fn test_type_coercion() {
        let decl = ParameterDeclaration::new(ParameterType::String);
        assert_eq!(decl.validate("s", &json!(3)).unwrap(), json!("3"));
        assert_eq!(decl.validate("s", &json!(true)).unwrap(), json!("true"));
        assert!(decl.validate("s", &json!({})).is_err());

        let decl = ParameterDeclaration::new(ParameterType::Int);
        assert_eq!(decl.validate("i", &json!(" 42 ")).unwrap(), json!(42));
        assert!(decl.validate("i", &json!(1.5)).is_err());
        assert!(decl.validate("i", &json!("many")).is_err());

        let decl = ParameterDeclaration::new(ParameterType::Bool);
        assert_eq!(decl.validate("b", &json!("TRUE")).unwrap(), json!(true));
        assert!(decl.validate("b", &json!(1)).is_err());

        let decl = ParameterDeclaration::new(ParameterType::Object);
        assert!(decl.validate("o", &json!([1])).is_err());

        let decl = ParameterDeclaration::new(ParameterType::Array);
        assert_eq!(decl.validate("a", &json!([1])).unwrap(), json!([1]));
    }

    #[test]
    fn test_range_and_length_constraints() {
        let decls = declarations(json!({
            "count": { "type": "int", "minValue": 1, "maxValue": 10 },
            "name": { "type": "string", "minLength": 2, "maxLength": 4 },
            "items": { "type": "array", "maxLength": 1 }
        }));

        assert!(decls.resolve(&object(json!({ "count": 0 }))).is_err());
        assert!(decls.resolve(&object(json!({ "count": 11 }))).is_err());
        assert!(decls.resolve(&object(json!({ "count": 10 }))).is_ok());
        assert!(decls.resolve(&object(json!({ "name": "a" }))).is_err());
        assert!(decls.resolve(&object(json!({ "name": "abcde" }))).is_err());
        assert!(decls.resolve(&object(json!({ "name": "äöü" }))).is_ok());
        assert!(decls.resolve(&object(json!({ "items": [1, 2] }))).is_err());
    }

    #[test]
    fn test_secure_string_is_redacted() {
        let decls = declarations(json!({
            "password": { "type": "secureString", "minLength": 12 }
        }));
        let err = decls.resolve(&object(json!({ "password": "hunter2" }))).unwrap_err();
        let message = err.to_string();
        assert!(!message.contains("hunter2"), "{}", message);
        assert!(message.contains("<redacted>"));
    }

    #[test]
    fn test_supplied_values_formats() {
        let wrapped = supplied_values(&json!({ "a": { "value": 1 }, "b": 2 })).unwrap();
        assert_eq!(wrapped["a"], json!(1));
        assert_eq!(wrapped["b"], json!(2));

        let deployment = supplied_values(&json!({
            "$schema": "https://schema.example/deploymentParameters.json#",
            "contentVersion": "1.0.0.0",
            "parameters": { "a": { "value": "x" } }
        }))
        .unwrap();
        assert_eq!(deployment.len(), 1);
        assert_eq!(deployment["a"], json!("x"));

        assert!(supplied_values(&Value::Null).unwrap().is_empty());
        assert!(supplied_values(&json!([1])).is_err());
    }
}
