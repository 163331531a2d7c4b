//! Attribute values
//!
//! What a resource exposes under a name: a plain JSON value, a nested
//! resource (possibly still an unfetched link), or an ordered list of either.

use super::node::Resource;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Attribute {
    Value(Value),
    Resource(Box<Resource>),
    List(Vec<Attribute>),
}

impl Attribute {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attribute::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Attribute::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        match self {
            Attribute::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Attribute::Resource(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Attribute]> {
        match self {
            Attribute::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Attribute>> {
        match self {
            Attribute::List(items) => Some(items),
            _ => None,
        }
    }

    /// True for values that PATCH on assignment (not objects or sequences)
    pub fn is_simple(&self) -> bool {
        matches!(self, Attribute::Value(v) if !v.is_object() && !v.is_array())
    }

    /// Short human-readable rendering, no network access
    pub fn summary(&self) -> String {
        match self {
            Attribute::Value(Value::String(s)) => s.clone(),
            Attribute::Value(Value::Null) => "-".to_string(),
            Attribute::Value(v) => v.to_string(),
            Attribute::Resource(r) => r.to_string(),
            Attribute::List(items) => format!("[{} items]", items.len()),
        }
    }
}

impl From<Value> for Attribute {
    fn from(value: Value) -> Self {
        Attribute::Value(value)
    }
}

impl From<Resource> for Attribute {
    fn from(resource: Resource) -> Self {
        Attribute::Resource(Box::new(resource))
    }
}

impl PartialEq<Value> for Attribute {
    fn eq(&self, other: &Value) -> bool {
        self.as_value() == Some(other)
    }
}

impl PartialEq<&str> for Attribute {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}
