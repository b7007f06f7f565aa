//! Core value types shared by the header, table and writer.
//!
//! Attribute values are a closed sum type: every consumer matches on
//! [`Scalar`], [`ArrayValue`] and [`AttributeValue`] exhaustively.

use crate::header::HeaderModel;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Numeric value of an `Int` or `Float`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Str(_) => None,
        }
    }

    /// Numeric value, also accepting strings that parse as a float
    pub fn parse_f64(&self) -> Option<f64> {
        match self {
            Scalar::Str(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

/// A homogeneous per-field vector; length equals the field count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayValue {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ArrayValue {
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Int(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
            ArrayValue::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `position` as a scalar
    pub fn get(&self, position: usize) -> Option<Scalar> {
        match self {
            ArrayValue::Int(v) => v.get(position).map(|x| Scalar::Int(*x)),
            ArrayValue::Float(v) => v.get(position).map(|x| Scalar::Float(*x)),
            ArrayValue::Str(v) => v.get(position).map(|x| Scalar::Str(x.clone())),
        }
    }

    /// Textual tokens in field order; NaN renders as an empty token
    pub fn tokens(&self) -> Vec<String> {
        match self {
            ArrayValue::Int(v) => v.iter().map(|x| x.to_string()).collect(),
            ArrayValue::Float(v) => v
                .iter()
                .map(|x| if x.is_nan() { String::new() } else { x.to_string() })
                .collect(),
            ArrayValue::Str(v) => v.clone(),
        }
    }
}

/// Value of a header attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Scalar(Scalar),
    Array(ArrayValue),
}

impl AttributeValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            AttributeValue::Scalar(s) => Some(s),
            AttributeValue::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            AttributeValue::Array(a) => Some(a),
            AttributeValue::Scalar(_) => None,
        }
    }
}

impl From<Scalar> for AttributeValue {
    fn from(value: Scalar) -> Self {
        AttributeValue::Scalar(value)
    }
}

impl From<ArrayValue> for AttributeValue {
    fn from(value: ArrayValue) -> Self {
        AttributeValue::Array(value)
    }
}

/// Attributes in declaration order
///
/// Re-inserting an existing key replaces its value in place, so the order
/// seen by the writer is the order of first declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeMap {
    entries: Vec<(String, AttributeValue)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attributes bound to one table column
pub type ColumnAttributes = BTreeMap<String, Scalar>;

/// Result of a read: the header model plus the assembled table
#[derive(Debug, Clone)]
pub struct Dataset {
    pub header: HeaderModel,
    pub table: Table,
}

impl Dataset {
    pub fn new(header: HeaderModel, table: Table) -> Self {
        Self { header, table }
    }

    /// Global attribute lookup
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.header.global().get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_map_preserves_order() {
        let mut map = AttributeMap::new();
        map.insert("b", Scalar::Int(1));
        map.insert("a", Scalar::from("x"));
        let previous = map.insert("b", Scalar::Float(2.5));

        assert_eq!(previous, Some(AttributeValue::Scalar(Scalar::Int(1))));
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            map.get("b").and_then(|v| v.as_scalar()),
            Some(&Scalar::Float(2.5))
        );
    }

    #[test]
    fn test_attribute_map_remove() {
        let mut map = AttributeMap::new();
        map.insert("a", Scalar::Int(1));
        assert!(map.remove("a").is_some());
        assert!(map.is_empty());
        assert!(map.remove("a").is_none());
    }

    #[test]
    fn test_scalar_numeric_access() {
        assert_eq!(Scalar::Int(3).as_f64(), Some(3.0));
        assert_eq!(Scalar::from("0.25").as_f64(), None);
        assert_eq!(Scalar::from(" 0.25 ").parse_f64(), Some(0.25));
        assert_eq!(Scalar::from("degC").parse_f64(), None);
    }

    #[test]
    fn test_array_tokens_render_nan_as_empty() {
        let array = ArrayValue::Float(vec![1.5, f64::NAN, -2.0]);
        assert_eq!(array.tokens(), vec!["1.5", "", "-2"]);
        assert_eq!(array.get(0), Some(Scalar::Float(1.5)));
        assert_eq!(array.get(3), None);
    }
}
