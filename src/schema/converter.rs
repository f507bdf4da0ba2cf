//! Converter resolution.
//!
//! # Converter Kinds
//! - Identity: raw string passes through
//! - Named: fixed operation looked up in [`NAMED_OPERATIONS`]
//! - Table: raw string must be a key of a [`ValueTable`]
//! - Custom: user closure
//! - Virtual: always rejects raw input
//!
//! # Design Decisions
//! - Declarations are collected in a [`ParamDecl`] and resolved once, so
//!   conflicting forms are rejected at declaration time
//! - Sequence parameters reuse the scalar converter per element, lazily

use std::fmt;
use std::sync::Arc;

use crate::schema::policy::Action;
use crate::schema::types::{BoxError, ConfigError, Result};
use crate::value::{RawSeq, RawValue, Sequence, Value};

/// User conversion closure.
pub type ConvertFn = Arc<dyn Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Operations addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedOp {
    ToInt,
    ToFloat,
    ToBool,
    ToStr,
    Strip,
    Downcase,
    Upcase,
    Length,
}

/// Dispatch table from operation name to operation.
pub const NAMED_OPERATIONS: [(&str, NamedOp); 8] = [
    ("to_i", NamedOp::ToInt),
    ("to_f", NamedOp::ToFloat),
    ("to_bool", NamedOp::ToBool),
    ("to_s", NamedOp::ToStr),
    ("strip", NamedOp::Strip),
    ("downcase", NamedOp::Downcase),
    ("upcase", NamedOp::Upcase),
    ("length", NamedOp::Length),
];

impl NamedOp {
    pub fn lookup(name: &str) -> Option<NamedOp> {
        NAMED_OPERATIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    pub fn name(&self) -> &'static str {
        NAMED_OPERATIONS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    pub fn apply(&self, raw: &str) -> std::result::Result<Value, BoxError> {
        let value = match self {
            NamedOp::ToInt => Value::Int(raw.trim().parse::<i64>()?),
            NamedOp::ToFloat => Value::Float(raw.trim().parse::<f64>()?),
            NamedOp::ToBool => Value::Bool(parse_bool(raw)?),
            NamedOp::ToStr => Value::Str(raw.to_string()),
            NamedOp::Strip => Value::Str(raw.trim().to_string()),
            NamedOp::Downcase => Value::Str(raw.to_lowercase()),
            NamedOp::Upcase => Value::Str(raw.to_uppercase()),
            NamedOp::Length => Value::Int(raw.chars().count() as i64),
        };
        Ok(value)
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, BoxError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other).into()),
    }
}

/// Fixed mapping from accepted strings to values, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    entries: Vec<(String, Value)>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ValueTable
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ValueTable::new(), |table, (k, v)| table.with(k, v))
    }
}

/// Runtime converter of a parameter.
#[derive(Clone)]
pub enum Converter {
    Identity,
    Named(NamedOp),
    Table(Arc<ValueTable>),
    Custom(ConvertFn),
    Virtual,
}

impl Converter {
    pub fn kind(&self) -> &'static str {
        match self {
            Converter::Identity => "identity",
            Converter::Named(_) => "named",
            Converter::Table(_) => "table",
            Converter::Custom(_) => "custom",
            Converter::Virtual => "virtual",
        }
    }

    /// Convert one raw string.
    ///
    /// `Ok(None)` means the value was dropped by an `ignore` policy.
    pub fn convert_str(
        &self,
        parameter: &str,
        raw: String,
        unknown_value: &Action,
    ) -> Result<Option<Value>> {
        match self {
            Converter::Identity => Ok(Some(Value::Str(raw))),
            Converter::Named(op) => op
                .apply(&raw)
                .map(Some)
                .map_err(|source| ConfigError::from_user(parameter, source)),
            Converter::Table(table) => match table.get(&raw) {
                Some(value) => Ok(Some(value.clone())),
                None => resolve_unknown_value(parameter, raw, table, unknown_value),
            },
            Converter::Custom(f) => f(&raw)
                .map(Some)
                .map_err(|source| ConfigError::from_user(parameter, source)),
            Converter::Virtual => Err(ConfigError::VirtualParameterSupplied(parameter.to_string())),
        }
    }

    /// Wrap a raw sequence so that each element is converted as it is consumed.
    pub fn convert_seq(&self, parameter: &str, raw: RawSeq, unknown_value: &Action) -> Result<Sequence> {
        if matches!(self, Converter::Virtual) {
            return Err(ConfigError::VirtualParameterSupplied(parameter.to_string()));
        }
        let converter = self.clone();
        let action = unknown_value.clone();
        let parameter = parameter.to_string();
        Ok(raw.filter_map(move |item| match item {
            Ok(raw) => converter.convert_str(&parameter, raw, &action).transpose(),
            Err(e) => Some(Err(e)),
        }))
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::Named(op) => write!(f, "Named({})", op.name()),
            Converter::Table(table) => write!(f, "Table({:?})", table.keys()),
            other => f.write_str(other.kind()),
        }
    }
}

fn resolve_unknown_value(
    parameter: &str,
    raw: String,
    table: &ValueTable,
    action: &Action,
) -> Result<Option<Value>> {
    match action {
        Action::Fail => Err(ConfigError::UnknownValue {
            parameter: parameter.to_string(),
            value: raw,
            allowed: table.keys(),
        }),
        Action::Accept => Ok(Some(Value::Str(raw))),
        Action::Ignore => {
            tracing::debug!(parameter, value = %raw, "Ignoring unknown value");
            Ok(None)
        }
        Action::Custom(f) => f(RawValue::Str(raw))
            .map(Some)
            .map_err(|source| ConfigError::from_user(parameter, source)),
    }
}

/// Declaration of a parameter's converter, before resolution.
///
/// At most one of the named, table and custom forms may be set; none means identity.
#[derive(Clone, Default)]
pub struct ParamDecl {
    named: Option<String>,
    table: Option<ValueTable>,
    custom: Option<ConvertFn>,
}

impl ParamDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, operation: impl Into<String>) -> Self {
        self.named = Some(operation.into());
        self
    }

    pub fn table(mut self, table: ValueTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(f));
        self
    }

    /// Build the runtime converter for `parameter`.
    pub fn resolve(self, parameter: &str) -> Result<Converter> {
        let forms = [self.named.is_some(), self.table.is_some(), self.custom.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count();
        if forms > 1 {
            return Err(ConfigError::Argument {
                parameter: parameter.to_string(),
                reason: "specify only one of a named operation, a value table or a custom converter"
                    .to_string(),
            });
        }

        if let Some(name) = self.named {
            return NamedOp::lookup(&name)
                .map(Converter::Named)
                .ok_or_else(|| ConfigError::Argument {
                    parameter: parameter.to_string(),
                    reason: format!("unknown named operation '{}'", name),
                });
        }
        if let Some(table) = self.table {
            if table.is_empty() {
                return Err(ConfigError::Argument {
                    parameter: parameter.to_string(),
                    reason: "value table has no entries".to_string(),
                });
            }
            return Ok(Converter::Table(Arc::new(table)));
        }
        Ok(self.custom.map(Converter::Custom).unwrap_or(Converter::Identity))
    }
}

impl fmt::Debug for ParamDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDecl")
            .field("named", &self.named)
            .field("table", &self.table)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl From<&str> for ParamDecl {
    fn from(operation: &str) -> Self {
        ParamDecl::new().named(operation)
    }
}

impl From<NamedOp> for ParamDecl {
    fn from(op: NamedOp) -> Self {
        ParamDecl::new().named(op.name())
    }
}

impl From<ValueTable> for ParamDecl {
    fn from(table: ValueTable) -> Self {
        ParamDecl::new().table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::LazySeq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn levels() -> ValueTable {
        [("low", 1), ("high", 2)].into_iter().collect()
    }

    #[test]
    fn test_named_lookup() {
        assert_eq!(NamedOp::lookup("to_i"), Some(NamedOp::ToInt));
        assert_eq!(NamedOp::lookup("to_sym"), None);
        assert_eq!(NamedOp::Length.name(), "length");
    }

    #[test]
    fn test_named_conversion() {
        let conv = ParamDecl::from("to_i").resolve("port").unwrap();
        let value = conv.convert_str("port", "9090".into(), &Action::Fail).unwrap();
        assert_eq!(value, Some(Value::Int(9090)));

        let err = conv.convert_str("port", "ninety".into(), &Action::Fail).unwrap_err();
        assert!(matches!(err, ConfigError::Conversion { ref parameter, .. } if parameter == "port"));
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(NamedOp::ToBool.apply("Yes").unwrap(), Value::Bool(true));
        assert_eq!(NamedOp::ToBool.apply("off").unwrap(), Value::Bool(false));
        assert!(NamedOp::ToBool.apply("maybe").is_err());
    }

    #[test]
    fn test_table_policies() {
        let conv = ParamDecl::from(levels()).resolve("level").unwrap();

        let hit = conv.convert_str("level", "low".into(), &Action::Fail).unwrap();
        assert_eq!(hit, Some(Value::Int(1)));

        match conv.convert_str("level", "mid".into(), &Action::Fail).unwrap_err() {
            ConfigError::UnknownValue { value, allowed, .. } => {
                assert_eq!(value, "mid");
                assert_eq!(allowed, vec!["low", "high"]);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let accepted = conv.convert_str("level", "mid".into(), &Action::Accept).unwrap();
        assert_eq!(accepted, Some(Value::from("mid")));

        let ignored = conv.convert_str("level", "mid".into(), &Action::Ignore).unwrap();
        assert_eq!(ignored, None);

        let custom = Action::custom(|_| Ok(Value::Int(0)));
        let resolved = conv.convert_str("level", "mid".into(), &custom).unwrap();
        assert_eq!(resolved, Some(Value::Int(0)));
    }

    #[test]
    fn test_more_than_one_form_is_rejected() {
        let decl = ParamDecl::new().named("to_i").custom(|s| Ok(Value::from(s)));
        let err = decl.resolve("port").unwrap_err();
        assert!(matches!(err, ConfigError::Argument { .. }));
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let err = ParamDecl::from("to_sym").resolve("name").unwrap_err();
        assert!(matches!(err, ConfigError::Argument { ref reason, .. } if reason.contains("to_sym")));
    }

    #[test]
    fn test_no_form_is_identity() {
        let conv = ParamDecl::new().resolve("name").unwrap();
        assert!(matches!(conv, Converter::Identity));
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = ParamDecl::from(ValueTable::new()).resolve("level").unwrap_err();
        assert!(matches!(err, ConfigError::Argument { ref parameter, .. } if parameter == "level"));
    }

    #[test]
    fn test_virtual_rejects_input() {
        let err = Converter::Virtual
            .convert_str("total", "7".into(), &Action::Accept)
            .unwrap_err();
        assert!(matches!(err, ConfigError::VirtualParameterSupplied(_)));
    }

    #[test]
    fn test_sequence_converts_on_demand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let conv = ParamDecl::new()
            .custom(move |s| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Int(s.len() as i64))
            })
            .resolve("words")
            .unwrap();

        let raw = LazySeq::once((0..5).map(|n| Ok("x".repeat(n))));
        let seq = conv.convert_seq("words", raw, &Action::Fail).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let prefix: Vec<_> = seq.iter().unwrap().take(2).map(|v| v.unwrap()).collect();
        assert_eq!(prefix, vec![Value::Int(0), Value::Int(1)]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sequence_element_errors_surface_lazily() {
        let conv = ParamDecl::from(levels()).resolve("levels").unwrap();
        let raw = LazySeq::once(vec![Ok("low".to_string()), Ok("mid".to_string())]);
        let seq = conv.convert_seq("levels", raw, &Action::Fail).unwrap();
        let items: Vec<_> = seq.iter().unwrap().collect();
        assert!(matches!(items[0], Ok(Value::Int(1))));
        assert!(matches!(items[1], Err(ConfigError::UnknownValue { .. })));
    }
}
