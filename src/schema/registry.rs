//! Parameter registry.
//!
//! # Invariants
//! - A name gets a converter at most once and a default at most once
//! - Names are never removed
//! - Iteration follows declaration order

use std::collections::HashMap;
use std::fmt;

use crate::schema::converter::{Converter, ParamDecl};
use crate::schema::deferred::Deferred;
use crate::schema::types::{ConfigError, Result};
use crate::value::Value;

/// Whether a parameter takes a single string or a sequence of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Sequence,
}

/// Default for a parameter absent from the raw input.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    /// Computed from the rest of the data after defaults are applied.
    Deferred(Deferred),
}

impl DefaultValue {
    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            DefaultValue::Deferred(d) => Some(d),
            DefaultValue::Literal(_) => None,
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultValue::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
        }
    }
}

/// Everything the schema knows about one parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    name: String,
    shape: Shape,
    converter: Option<Converter>,
    default: Option<DefaultValue>,
    is_virtual: bool,
}

impl ParameterSpec {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Scalar,
            converter: None,
            default: None,
            is_virtual: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }
}

/// Name → [`ParameterSpec`] store of one schema.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    specs: Vec<ParameterSpec>,
    index: HashMap<String, usize>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &str) -> &mut ParameterSpec {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.specs.push(ParameterSpec::new(name));
                self.index.insert(name.to_string(), self.specs.len() - 1);
                self.specs.len() - 1
            }
        };
        &mut self.specs[i]
    }

    fn has_converter(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|spec| spec.converter.is_some())
    }

    fn has_default(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|spec| spec.default.is_some())
    }

    /// Register the converter for `name`.
    pub fn declare(&mut self, name: &str, shape: Shape, decl: ParamDecl) -> Result<()> {
        if self.has_converter(name) {
            return Err(ConfigError::DuplicateParameter(name.to_string()));
        }
        let converter = decl.resolve(name)?;
        let spec = self.entry(name);
        spec.shape = shape;
        spec.converter = Some(converter);
        Ok(())
    }

    /// Register the default for `name`.
    pub fn declare_default(&mut self, name: &str, default: DefaultValue) -> Result<()> {
        if self.has_default(name) {
            return Err(ConfigError::DuplicateDefault(name.to_string()));
        }
        self.entry(name).default = Some(default);
        Ok(())
    }

    /// Register a parameter computed by `resolver` that never accepts raw input.
    pub fn declare_virtual(&mut self, name: &str, resolver: Deferred) -> Result<()> {
        if self.has_converter(name) {
            return Err(ConfigError::DuplicateParameter(name.to_string()));
        }
        if self.has_default(name) {
            return Err(ConfigError::DuplicateDefault(name.to_string()));
        }
        let spec = self.entry(name);
        spec.converter = Some(Converter::Virtual);
        spec.default = Some(DefaultValue::Deferred(resolver));
        spec.is_virtual = true;
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ParameterSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_converter() {
        let mut registry = ParameterRegistry::new();
        registry.declare("port", Shape::Scalar, "to_i".into()).unwrap();
        let err = registry.declare("port", Shape::Scalar, ParamDecl::new()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateParameter(name) if name == "port"));
    }

    #[test]
    fn test_duplicate_default() {
        let mut registry = ParameterRegistry::new();
        registry
            .declare_default("port", DefaultValue::Literal(Value::Int(8080)))
            .unwrap();
        let err = registry
            .declare_default("port", DefaultValue::Literal(Value::Int(80)))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDefault(_)));
    }

    #[test]
    fn test_default_before_converter() {
        let mut registry = ParameterRegistry::new();
        registry
            .declare_default("port", DefaultValue::Literal(Value::Int(8080)))
            .unwrap();
        registry.declare("port", Shape::Scalar, "to_i".into()).unwrap();
        let spec = registry.lookup("port").unwrap();
        assert!(spec.converter().is_some());
        assert!(spec.default_value().is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_declaration_adds_nothing() {
        let mut registry = ParameterRegistry::new();
        assert!(registry.declare("x", Shape::Scalar, "to_sym".into()).is_err());
        assert!(registry.lookup("x").is_none());
    }

    #[test]
    fn test_virtual_blocks_converter_and_default() {
        let mut registry = ParameterRegistry::new();
        registry
            .declare_virtual("total", Deferred::new(|_| Ok(Value::Int(0))))
            .unwrap();
        let spec = registry.lookup("total").unwrap();
        assert!(spec.is_virtual());
        assert!(matches!(spec.converter(), Some(Converter::Virtual)));
        assert!(spec.default_value().and_then(DefaultValue::as_deferred).is_some());

        assert!(matches!(
            registry.declare("total", Shape::Scalar, ParamDecl::new()),
            Err(ConfigError::DuplicateParameter(_))
        ));
        assert!(matches!(
            registry.declare_default("total", DefaultValue::Literal(Value::Int(1))),
            Err(ConfigError::DuplicateDefault(_))
        ));
    }

    #[test]
    fn test_declaration_order() {
        let mut registry = ParameterRegistry::new();
        for name in ["b", "a", "c"] {
            registry.declare(name, Shape::Scalar, ParamDecl::new()).unwrap();
        }
        let names: Vec<_> = registry.iter().map(ParameterSpec::name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
