//! ActionInfo validation
//!
//! Compiles a Redfish ActionInfo document into a checker that runs before an
//! action is POSTed, so bad arguments never reach the service.

use crate::error::ValidationError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Redfish ActionInfo `DataType` values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// Checked like a string
    Password,
    /// Only checked through `AllowableValues`
    Enumeration,
    /// Anything we do not know; accepts every value
    Other(String),
}

impl DataType {
    pub fn parse(name: &str) -> Self {
        match name {
            "String" => DataType::String,
            "Integer" => DataType::Integer,
            "Number" => DataType::Number,
            "Boolean" => DataType::Boolean,
            "Array" => DataType::Array,
            "Object" => DataType::Object,
            "Password" => DataType::Password,
            "Enumeration" => DataType::Enumeration,
            other => DataType::Other(other.to_string()),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            DataType::String | DataType::Password => value.is_string(),
            DataType::Integer => value.is_i64() || value.is_u64(),
            DataType::Number => value.is_number(),
            DataType::Boolean => value.is_boolean(),
            DataType::Array => value.is_array(),
            DataType::Object => value.is_object(),
            DataType::Enumeration | DataType::Other(_) => true,
        }
    }
}

/// One entry of ActionInfo `Parameters`
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub required: bool,
    pub data_type: Option<String>,
    pub allowable_values: Option<Vec<Value>>,
}

/// Wire shape of a parameter entry; services fill these fields loosely
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawParameter {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    required: Option<Value>,
    #[serde(default)]
    data_type: Option<Value>,
    #[serde(default)]
    allowable_values: Option<Value>,
}

impl RawParameter {
    fn into_spec(self) -> Option<ParameterSpec> {
        let name = match self.name {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return None,
        };
        Some(ParameterSpec {
            name,
            required: self.required.as_ref().and_then(Value::as_bool).unwrap_or(false),
            data_type: self
                .data_type
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string),
            allowable_values: match self.allowable_values {
                Some(Value::Array(values)) => Some(values),
                _ => None,
            },
        })
    }
}

impl ParameterSpec {
    pub fn kind(&self) -> Option<DataType> {
        self.data_type.as_deref().map(DataType::parse)
    }
}

/// Validator compiled from an ActionInfo document
#[derive(Debug, Clone, Default)]
pub struct ActionValidator {
    parameters: Vec<ParameterSpec>,
}

impl ActionValidator {
    /// Build from `{"Parameters": [...]}`. Entries without a string `Name`
    /// are ignored; a non-boolean `Required` reads as optional.
    pub fn from_schema(schema: &Value) -> Self {
        let entries = schema
            .get("Parameters")
            .or_else(|| schema.get("parameters"))
            .and_then(Value::as_array);

        let mut parameters: Vec<ParameterSpec> = Vec::new();
        for entry in entries.into_iter().flatten() {
            let Some(spec) = RawParameter::deserialize(entry).ok().and_then(RawParameter::into_spec)
            else {
                continue;
            };
            // A repeated name replaces the earlier entry
            match parameters.iter_mut().find(|p| p.name == spec.name) {
                Some(existing) => *existing = spec,
                None => parameters.push(spec),
            }
        }

        Self { parameters }
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    fn spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check required, unknown, datatype and allowable values, in that order
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), ValidationError> {
        let missing: Vec<String> = self
            .parameters
            .iter()
            .filter(|p| p.required && !args.contains_key(&p.name))
            .map(|p| p.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::Missing(missing));
        }

        let unknown: Vec<String> = args
            .keys()
            .filter(|key| self.spec(key).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::Unknown(unknown));
        }

        for spec in &self.parameters {
            let Some(value) = args.get(&spec.name) else {
                continue;
            };

            if let Some(kind) = spec.kind() {
                if !kind.accepts(value) {
                    return Err(ValidationError::WrongType {
                        name: spec.name.clone(),
                        expected: spec.data_type.clone().unwrap_or_default(),
                        actual: json_type_name(value),
                    });
                }
            }

            if let Some(allowed) = spec.allowable_values.as_ref().filter(|a| !a.is_empty()) {
                if !allowed.contains(value) {
                    return Err(ValidationError::NotAllowed {
                        name: spec.name.clone(),
                        allowed: allowed.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Human-readable parameter summary, e.g. `ResetType:String required in [..]`
    pub fn signature(&self) -> String {
        if self.parameters.is_empty() {
            return "no parameters".to_string();
        }

        self.parameters
            .iter()
            .map(|p| {
                let kind = p.data_type.as_deref().unwrap_or("Any");
                let req = if p.required { "required" } else { "optional" };
                match p.allowable_values.as_ref().filter(|a| !a.is_empty()) {
                    Some(allowed) => {
                        let allowed: Vec<String> = allowed.iter().map(Value::to_string).collect();
                        format!("{}:{} {} in [{}]", p.name, kind, req, allowed.join(", "))
                    },
                    None => format!("{}:{} {}", p.name, kind, req),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
