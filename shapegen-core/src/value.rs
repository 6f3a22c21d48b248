//! Dynamically typed values that schemas validate and generators produce.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Number, Value as JsonValue};

use crate::schema::ParseError;

#[cfg(test)]
#[path = "../tests/internal/value_unit_tests.rs"]
mod tests;

/// A runtime value of any shape a schema can describe.
#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    Date(DateTime<Utc>),
    Symbol(Symbol),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// Key/value pairs in insertion order; keys are unique.
    Map(Vec<(Value, Value)>),
    /// Elements in insertion order; elements are unique.
    Set(Vec<Value>),
    Function(FunctionValue),
    /// An already-settled promise.
    Promise(Box<Value>),
}

impl Value {
    /// Builds a map, letting later pairs overwrite earlier pairs with an equal key.
    pub fn map_from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let mut entries: Vec<(Value, Value)> = Vec::new();
        for (key, value) in pairs {
            match entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
        Value::Map(entries)
    }

    /// Builds a set, keeping the first occurrence of each element.
    pub fn set_from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut elements: Vec<Value> = Vec::new();
        for item in items {
            if !elements.contains(&item) {
                elements.push(item);
            }
        }
        Value::Set(elements)
    }

    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn promise(value: Value) -> Self {
        Value::Promise(Box::new(value))
    }

    /// Lowercase runtime type name, used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(number) if number.is_nan() => "nan",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Function(_) => "function",
            Value::Promise(_) => "promise",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the settled value of a promise.
    pub fn resolve(&self) -> Option<&Value> {
        match self {
            Value::Promise(value) => Some(value),
            _ => None,
        }
    }

    /// Converts the JSON-representable subset of values.
    ///
    /// Object entries holding `undefined` are dropped, mirroring how JSON
    /// serialization treats absent members. Non-finite numbers, bigints, dates,
    /// symbols, maps, sets, functions, and promises have no JSON rendering.
    pub fn to_json(&self) -> Option<JsonValue> {
        match self {
            Value::Null => Some(JsonValue::Null),
            Value::Bool(value) => Some(JsonValue::Bool(*value)),
            Value::Number(value) => Number::from_f64(*value).map(JsonValue::Number),
            Value::String(value) => Some(JsonValue::String(value.clone())),
            Value::Array(items) => items
                .iter()
                .map(Value::to_json)
                .collect::<Option<Vec<_>>>()
                .map(JsonValue::Array),
            Value::Object(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map {
                    if value.is_undefined() {
                        continue;
                    }
                    object.insert(key.clone(), value.to_json()?);
                }
                Some(JsonValue::Object(object))
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Number(left), Value::Number(right)) => {
                left == right || (left.is_nan() && right.is_nan())
            }
            (Value::BigInt(left), Value::BigInt(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Date(left), Value::Date(right)) => left == right,
            (Value::Symbol(left), Value::Symbol(right)) => left == right,
            (Value::Array(left), Value::Array(right)) | (Value::Set(left), Value::Set(right)) => {
                left == right
            }
            (Value::Object(left), Value::Object(right)) => left == right,
            (Value::Map(left), Value::Map(right)) => left == right,
            (Value::Function(left), Value::Function(right)) => left == right,
            (Value::Promise(left), Value::Promise(right)) => left == right,
            _ => false,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(value) => Value::Bool(value),
            JsonValue::Number(number) => Value::Number(number.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(value) => Value::String(value),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// A unique symbol; two symbols are equal only if one was cloned from the other.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: u64,
    description: Option<String>,
}

impl Symbol {
    pub fn new(description: Option<String>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

type CallFn = dyn Fn(&[Value]) -> Result<Value, ParseError> + Send + Sync;

/// A callable value.
#[derive(Clone)]
pub struct FunctionValue(Arc<CallFn>);

impl FunctionValue {
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ParseError> + Send + Sync + 'static,
    {
        Self(Arc::new(call))
    }

    /// A function that ignores its arguments and always yields `value`.
    pub fn returning(value: Value) -> Self {
        Self::new(move |_args| Ok(value.clone()))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ParseError> {
        (self.0)(args)
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FunctionValue(..)")
    }
}
