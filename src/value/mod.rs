//! Raw input and converted values.
//!
//! # Data Flow
//! ```text
//! parser collaborator
//!     → RawData (name → RawValue: string or lazy sequence of strings)
//!     → converters
//!     → Value (typed scalar or lazy sequence of converted elements)
//! ```

pub mod ordered;
pub mod sequence;

use std::fmt;

use serde::ser::{Error as _, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::schema::Result;
pub use ordered::OrderedMap;
pub use sequence::{LazySeq, SeqIter};

/// Raw sequence as produced by a parser.
///
/// Elements carry read failures, so a source that breaks mid-way surfaces an
/// error to the consumer instead of ending early.
pub type RawSeq = LazySeq<Result<String>>;

/// Converted sequence; element conversion errors surface as they are consumed.
pub type Sequence = LazySeq<Result<Value>>;

/// A converted parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Sequence),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Sequence> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
        }
    }
}

/// Sequences compare by identity, never by consuming their elements.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a.same_source(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Seq(_) => f.write_str("<sequence>"),
        }
    }
}

/// Sequences serialize their elements, which consumes a one-shot sequence.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Seq(seq) => {
                let iter = seq.iter().map_err(S::Error::custom)?;
                let mut out = serializer.serialize_seq(None)?;
                for item in iter {
                    let value = item.map_err(S::Error::custom)?;
                    out.serialize_element(&value)?;
                }
                out.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Sequence> for Value {
    fn from(seq: Sequence) -> Self {
        Value::Seq(seq)
    }
}

/// A raw value handed over by a parser.
#[derive(Debug, Clone)]
pub enum RawValue {
    Str(String),
    Seq(RawSeq),
}

impl RawValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Str(s) => Some(s),
            RawValue::Seq(_) => None,
        }
    }

    /// Pass-through conversion used by `accept` policies and identity converters.
    pub fn into_value(self) -> Value {
        match self {
            RawValue::Str(s) => Value::Str(s),
            RawValue::Seq(seq) => Value::Seq(seq.map(|item| item.map(Value::Str))),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Str(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Str(s)
    }
}

impl From<RawSeq> for RawValue {
    fn from(seq: RawSeq) -> Self {
        RawValue::Seq(seq)
    }
}

/// Infallible element sources, such as in-memory lists.
impl From<LazySeq<String>> for RawValue {
    fn from(seq: LazySeq<String>) -> Self {
        RawValue::Seq(seq.map(Ok))
    }
}

/// Ordered mapping from parameter name to raw value, as produced by a parser.
pub type RawData = OrderedMap<RawValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_data_collects_strings_and_sequences() {
        let mut raw: RawData = [("b", "1"), ("a", "2")].into_iter().collect();
        raw.insert("hosts", LazySeq::once(vec!["h1".to_string()]));
        assert_eq!(raw.get("a").and_then(RawValue::as_str), Some("2"));
        assert!(matches!(raw.get("hosts"), Some(RawValue::Seq(_))));
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["b", "a", "hosts"]);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(7).as_i64(), Some(7));
        assert_eq!(Value::from(7).as_f64(), Some(7.0));
        assert_eq!(Value::from("x").as_i64(), None);
        assert_eq!(Value::from(true).kind(), "bool");
    }

    #[test]
    fn test_sequence_serializes_elements() {
        let raw = RawValue::from(LazySeq::restartable(|| vec!["a".to_string(), "b".to_string()]));
        let value = raw.into_value();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
    }

    #[test]
    fn test_raw_read_error_reaches_value() {
        let items: Vec<Result<String>> = vec![
            Ok("a".to_string()),
            Err(crate::schema::ConfigError::SequenceConsumed),
        ];
        let value = RawValue::Seq(LazySeq::once(items)).into_value();
        let mut iter = value.as_seq().unwrap().iter().unwrap();
        assert_eq!(iter.next().unwrap().unwrap(), Value::from("a"));
        assert!(iter.next().unwrap().is_err());
    }

    #[test]
    fn test_sequence_equality_is_identity() {
        let seq: Sequence = LazySeq::once(Vec::new());
        let a = Value::Seq(seq.clone());
        assert_eq!(a, Value::Seq(seq));
        assert_ne!(a, Value::Seq(LazySeq::once(Vec::new())));
    }
}
