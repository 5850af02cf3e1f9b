//! Host-side value representation and the two-way Starlark conversion layer.
//!
//! `ScriptValue` is the engine's view of an expression result: a small sum
//! type that crosses thread and evaluation boundaries without touching a
//! Starlark heap. Conversions are explicit in both directions.

use starlark::values::dict::{AllocDict, DictRef};
use starlark::values::float::StarlarkFloat;
use starlark::values::list::{AllocList, ListRef};
use starlark::values::{Heap, Value, ValueLike};

/// A host-language value mirroring the runtime's value universe.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// Starlark `None`
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ScriptValue>),
    /// Insertion-ordered key/value pairs
    Dict(Vec<(ScriptValue, ScriptValue)>),
}

impl ScriptValue {
    /// Allocate this value on a Starlark heap.
    pub fn alloc<'v>(&self, heap: &'v Heap) -> Value<'v> {
        match self {
            ScriptValue::Nil => Value::new_none(),
            ScriptValue::Bool(b) => Value::new_bool(*b),
            ScriptValue::Int(i) => heap.alloc(*i),
            ScriptValue::Float(f) => heap.alloc(*f),
            ScriptValue::Str(s) => heap.alloc(s.as_str()),
            ScriptValue::List(items) => heap.alloc(AllocList(items.iter().map(|v| v.alloc(heap)))),
            ScriptValue::Dict(pairs) => heap.alloc(AllocDict(
                pairs.iter().map(|(k, v)| (k.alloc(heap), v.alloc(heap))),
            )),
        }
    }

    /// Convert a Starlark value back into a host value.
    ///
    /// Values with no host representation (functions, modules, opaque
    /// objects) fall back to their canonical string rendering.
    pub fn from_value(value: Value) -> ScriptValue {
        if value.is_none() {
            return ScriptValue::Nil;
        }
        if let Some(b) = value.unpack_bool() {
            return ScriptValue::Bool(b);
        }
        if let Some(i) = value.unpack_i32() {
            return ScriptValue::Int(i as i64);
        }
        if let Some(f) = value.downcast_ref::<StarlarkFloat>() {
            return ScriptValue::Float(f.0);
        }
        if let Some(s) = value.unpack_str() {
            return ScriptValue::Str(s.to_string());
        }
        if let Some(list) = ListRef::from_value(value) {
            return ScriptValue::List(list.iter().map(ScriptValue::from_value).collect());
        }
        if let Some(dict) = DictRef::from_value(value) {
            return ScriptValue::Dict(
                dict.iter()
                    .map(|(k, v)| (ScriptValue::from_value(k), ScriptValue::from_value(v)))
                    .collect(),
            );
        }
        ScriptValue::Str(value.to_str())
    }

    /// Convert a YAML value (frontmatter, config) into a host value.
    pub fn from_yaml(value: &serde_yaml::Value) -> ScriptValue {
        match value {
            serde_yaml::Value::Null => ScriptValue::Nil,
            serde_yaml::Value::Bool(b) => ScriptValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ScriptValue::Int(i)
                } else {
                    ScriptValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_yaml::Value::String(s) => ScriptValue::Str(s.clone()),
            serde_yaml::Value::Sequence(items) => {
                ScriptValue::List(items.iter().map(ScriptValue::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => ScriptValue::Dict(
                map.iter()
                    .map(|(k, v)| (ScriptValue::from_yaml(k), ScriptValue::from_yaml(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => ScriptValue::from_yaml(&tagged.value),
        }
    }

    /// The value as a string slice, when it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer, when it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Canonical quoted rendering, as inside containers (`repr` semantics).
    fn repr(&self) -> String {
        match self {
            ScriptValue::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ScriptValue {
    /// Stringification follows the runtime's `str()`: strings verbatim,
    /// `True`/`False`/`None`, canonical brackets and braces for containers.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "None"),
            ScriptValue::Bool(true) => write!(f, "True"),
            ScriptValue::Bool(false) => write!(f, "False"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            ScriptValue::Str(s) => f.write_str(s),
            ScriptValue::List(items) => {
                let inner: Vec<String> = items.iter().map(ScriptValue::repr).collect();
                write!(f, "[{}]", inner.join(", "))
            }
            ScriptValue::Dict(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::Str(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::Str(s)
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        ScriptValue::Int(i)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
