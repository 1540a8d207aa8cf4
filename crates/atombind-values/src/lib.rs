//! Managed value model for atombind.
//!
//! Everything that crosses the native boundary is represented on the managed
//! side by a [`Value`]. Arrays use [`FortArray`], a column-major array view
//! that carries the native origin (first element at index 1 by default) as an
//! explicit `offset` property rather than silently renumbering from zero.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

mod array;

pub use array::{ArrayData, ElemKind, FortArray};

/// A managed value: scalar, string, array or record snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Num(f64),
    Bool(bool),
    String(String),
    Array(FortArray),
    Dict(Dict),
}

impl Value {
    /// Name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Num(_) => "num",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }
}

/// A record snapshot: field name to value mapping.
///
/// Used both for proxy-field snapshots and for the params/properties blocks
/// of composite objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict {
    pub entries: HashMap<String, Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Keys in sorted order, for deterministic diagnostics.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inclusive 1-based integer range, matching the native indexing convention.
///
/// `frange(n)` iterates `1, 2, ..., n`.
pub fn frange(stop: i64) -> std::ops::RangeInclusive<i64> {
    1..=stop
}

// From implementations for Value
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Num(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<FortArray> for Value {
    fn from(a: FortArray) -> Self {
        Value::Array(a)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

// TryFrom implementations for extracting native types
impl TryFrom<&Value> for i32 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(i) => Ok(*i),
            Value::Num(n) => Ok(*n as i32),
            _ => Err(format!("cannot convert {v:?} to i32")),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Num(n) => Ok(*n),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(format!("cannot convert {v:?} to f64")),
        }
    }
}

impl TryFrom<&Value> for bool {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(format!("cannot convert {v:?} to bool")),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Num(n) => Ok(n.to_string()),
            _ => Err(format!("cannot convert {v:?} to String")),
        }
    }
}

impl TryFrom<&Value> for FortArray {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Array(a) => Ok(a.clone()),
            _ => Err(format!("cannot convert {v:?} to FortArray")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { 1 } else { 0 }),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Array(a) => write!(f, "{a}"),
            Value::Dict(d) => {
                write!(f, "{{")?;
                for (i, key) in d.sorted_keys().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, d.entries[*key])?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryInto;

    #[test]
    fn test_value_conversions() {
        let int_val = Value::Int(42);
        let num_val = Value::Num(3.15);
        let bool_val = Value::Bool(true);
        let str_val = Value::String("hello".to_string());

        assert_eq!(Value::from(42), int_val);
        assert_eq!(Value::from(3.15), num_val);
        assert_eq!(Value::from(true), bool_val);
        assert_eq!(Value::from("hello"), str_val);

        assert_eq!((&int_val).try_into(), Ok(42i32));
        assert_eq!((&num_val).try_into(), Ok(3.15f64));
        assert_eq!((&bool_val).try_into(), Ok(true));
        assert_eq!((&str_val).try_into(), Ok("hello".to_string()));
    }

    #[test]
    fn test_dict_sorted_keys() {
        let mut d = Dict::new();
        d.insert("cutoff", 3.0);
        d.insert("atoms", 8);
        assert_eq!(d.sorted_keys(), vec!["atoms", "cutoff"]);
        assert_eq!(d.get("atoms"), Some(&Value::Int(8)));
    }

    #[test]
    fn test_frange_is_one_based_inclusive() {
        let v: Vec<i64> = frange(4).collect();
        assert_eq!(v, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_dict_display() {
        let mut d = Dict::new();
        d.insert("b", 2);
        d.insert("a", 1);
        assert_eq!(format!("{}", Value::Dict(d)), "{a: 1, b: 2}");
    }
}
