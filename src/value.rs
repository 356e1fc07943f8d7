//! Unstructured parameter values.
//!
//! Parameters flow through the engine as [`Value`], a tagged sum over the
//! scalar and list shapes a topology document can express. The engine never
//! interprets payload contents; models pull parameters out with the typed
//! accessors, which convert between arms where a conversion is unambiguous.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A name-keyed set of [`Value`]s, used for simulation, instance, and pad
/// parameters alike.
pub type Properties = HashMap<String, Value>;

/// An unstructured, dynamically typed value.
///
/// Serialized untagged, so JSON scalars and homogeneous arrays map directly:
/// integers become [`Value::Int`], floats [`Value::Double`], and so on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The absent value.
    #[default]
    None,
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 string.
    Str(String),
    /// List of signed integers.
    IntList(Vec<i64>),
    /// List of unsigned integers.
    UIntList(Vec<u64>),
    /// List of doubles.
    DoubleList(Vec<f64>),
    /// List of strings.
    StrList(Vec<String>),
}

impl Value {
    /// Returns true for [`Value::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns the value as a signed integer, converting from the unsigned,
    /// double, and string arms where the conversion is lossless enough to be
    /// useful (doubles truncate, strings parse).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Double(v) => Some(*v as i64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer. Negative integers and
    /// unparsable strings yield `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::UInt(v) => Some(*v),
            Value::Double(v) if *v >= 0.0 => Some(*v as u64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a double.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a string, formatting numeric scalars.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(v) => Some(v.to_string()),
            Value::UInt(v) => Some(v.to_string()),
            Value::Double(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Returns a borrowed string if this is the string arm.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the value as a boolean.
    ///
    /// Numerics are false at zero, true otherwise. Strings starting with
    /// `n`, `N`, `f`, `F`, `of`, or `Of` parse false, as does the empty
    /// string; every other string parses true. List arms yield `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Int(v) => Some(*v != 0),
            Value::UInt(v) => Some(*v != 0),
            Value::Double(v) => Some(*v != 0.0),
            Value::Str(s) => Some(parse_bool_str(s)),
            _ => None,
        }
    }
}

fn parse_bool_str(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let falsy = ["n", "N", "f", "F", "of", "Of"];
    !falsy.iter().any(|p| s.starts_with(p))
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
