//! Schema Validator: structural checks applied to backend JSON before it reaches a controller.
//!
//! Each payload type implements [`Schema`] by reading its keys through [`Fields`].
//! Nullable keys must be present with an explicit `null`; an absent key is a violation.
//! Unknown keys are ignored.

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub mod resume;
pub mod search;

/// Structural mismatch between a JSON payload and the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unexpected response shape at {path}: expected {expected}, found {actual}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl SchemaViolation {
    pub fn new(path: &str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    fn wrong_type(path: &str, expected: &str, value: &Value) -> Self {
        Self::new(path, expected, kind_of(value))
    }
}

/// A type that can be narrowed from an untyped JSON value.
pub trait Schema: Sized {
    fn from_json(value: &Value, path: &str) -> Result<Self, SchemaViolation>;
}

/// Validates `raw` against `T`, reporting paths relative to the document root `$`.
pub fn validate<T: Schema>(raw: &Value) -> Result<T, SchemaViolation> {
    T::from_json(raw, "$")
}

/// JSON type name used in violation reports.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed accessor over the keys of one JSON object.
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    pub fn of(value: &'a Value, path: &'a str) -> Result<Self, SchemaViolation> {
        match value {
            Value::Object(map) => Ok(Self { map, path }),
            other => Err(SchemaViolation::wrong_type(path, "object", other)),
        }
    }

    fn child_path(&self, key: &str) -> String {
        format!("{}.{}", self.path, key)
    }

    fn required(&self, key: &str, expected: &str) -> Result<(&'a Value, String), SchemaViolation> {
        let path = self.child_path(key);
        match self.map.get(key) {
            Some(value) => Ok((value, path)),
            None => Err(SchemaViolation::new(&path, expected, "missing key")),
        }
    }

    pub fn string(&self, key: &str) -> Result<String, SchemaViolation> {
        let (value, path) = self.required(key, "string")?;
        as_string(value, &path)
    }

    pub fn nullable_string(&self, key: &str) -> Result<Option<String>, SchemaViolation> {
        let (value, path) = self.required(key, "string or null")?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Err(SchemaViolation::wrong_type(&path, "string or null", other)),
        }
    }

    pub fn number(&self, key: &str) -> Result<f64, SchemaViolation> {
        let (value, path) = self.required(key, "number")?;
        value
            .as_f64()
            .ok_or_else(|| SchemaViolation::wrong_type(&path, "number", value))
    }

    pub fn count(&self, key: &str) -> Result<u64, SchemaViolation> {
        let (value, path) = self.required(key, "non-negative integer")?;
        value
            .as_u64()
            .ok_or_else(|| SchemaViolation::new(&path, "non-negative integer", describe(value)))
    }

    pub fn boolean(&self, key: &str) -> Result<bool, SchemaViolation> {
        let (value, path) = self.required(key, "boolean")?;
        value
            .as_bool()
            .ok_or_else(|| SchemaViolation::wrong_type(&path, "boolean", value))
    }

    pub fn url(&self, key: &str) -> Result<Url, SchemaViolation> {
        let (value, path) = self.required(key, "URL string")?;
        as_url(value, &path)
    }

    pub fn nullable_url(&self, key: &str) -> Result<Option<Url>, SchemaViolation> {
        let (value, path) = self.required(key, "URL string or null")?;
        match value {
            Value::Null => Ok(None),
            other => as_url(other, &path).map(Some).map_err(|mut e| {
                e.expected = "URL string or null".to_string();
                e
            }),
        }
    }

    /// A UUID-formatted string, kept in its textual form.
    pub fn uuid_string(&self, key: &str) -> Result<String, SchemaViolation> {
        let (value, path) = self.required(key, "UUID string")?;
        let text = as_string(value, &path)?;
        Uuid::parse_str(&text)
            .map(|_| text.clone())
            .map_err(|_| SchemaViolation::new(&path, "UUID string", format!("\"{text}\"")))
    }

    pub fn string_array(&self, key: &str) -> Result<Vec<String>, SchemaViolation> {
        let (value, path) = self.required(key, "array of strings")?;
        each(value, &path, as_string)
    }

    pub fn array<T: Schema>(&self, key: &str) -> Result<Vec<T>, SchemaViolation> {
        let (value, path) = self.required(key, "array")?;
        each(value, &path, T::from_json)
    }

    pub fn object<T: Schema>(&self, key: &str) -> Result<T, SchemaViolation> {
        let (value, path) = self.required(key, "object")?;
        T::from_json(value, &path)
    }

}

pub fn one_of(value: &Value, path: &str, allowed: &[&str]) -> Result<String, SchemaViolation> {
    let text = as_string(value, path)?;
    if allowed.contains(&text.as_str()) {
        Ok(text)
    } else {
        Err(SchemaViolation::new(
            path,
            format!("one of {}", allowed.join(" | ")),
            format!("\"{text}\""),
        ))
    }
}

fn as_string(value: &Value, path: &str) -> Result<String, SchemaViolation> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaViolation::wrong_type(path, "string", value))
}

fn as_url(value: &Value, path: &str) -> Result<Url, SchemaViolation> {
    let text = as_string(value, path)?;
    Url::parse(&text).map_err(|_| SchemaViolation::new(path, "URL string", format!("\"{text}\"")))
}

fn each<T>(
    value: &Value,
    path: &str,
    item: impl Fn(&Value, &str) -> Result<T, SchemaViolation>,
) -> Result<Vec<T>, SchemaViolation> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaViolation::wrong_type(path, "array", value))?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| item(v, &format!("{path}[{i}]")))
        .collect()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        other => kind_of(other).to_string(),
    }
}
