//! Deferred (virtual) parameter resolution.
//!
//! # Data Flow
//! ```text
//! declaration: virtual / deferred default → Deferred marker in registry
//! build:       resolution_order() sorts markers by declared dependencies
//! load:        defaults stage markers → each marker resolved once, in order,
//!              against a Context over the staged data
//! ```
//!
//! # Design Decisions
//! - Dependencies are explicit (`Deferred::after`); the order is fixed when
//!   the schema is built, with declaration order breaking ties
//! - Reading a still-pending parameter that was not declared as a dependency
//!   is an error, never a silent read of a marker

use std::fmt;
use std::sync::Arc;

use crate::instance::loader::{Staged, Staging};
use crate::schema::registry::ParameterRegistry;
use crate::schema::types::{BoxError, ConfigError, Result};
use crate::value::Value;

/// Resolver closure of a deferred parameter.
pub type ResolveFn = Arc<dyn Fn(&Context<'_>) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// A value computed from the rest of the data once conversion and defaults are done.
#[derive(Clone)]
pub struct Deferred {
    resolve: ResolveFn,
    after: Vec<String>,
}

impl Deferred {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            resolve: Arc::new(f),
            after: Vec::new(),
        }
    }

    /// Declare parameters whose deferred values must be resolved first.
    pub fn after<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn dependencies(&self) -> &[String] {
        &self.after
    }

    pub(crate) fn resolve(&self, ctx: &Context<'_>) -> std::result::Result<Value, BoxError> {
        (self.resolve)(ctx)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

/// Read-only view of the staged data handed to resolvers.
pub struct Context<'a> {
    staging: &'a Staging,
    parameter: &'a str,
}

impl<'a> Context<'a> {
    pub(crate) fn new(staging: &'a Staging, parameter: &'a str) -> Self {
        Self { staging, parameter }
    }

    /// Name of the parameter being resolved.
    pub fn parameter(&self) -> &str {
        self.parameter
    }

    /// True when `name` holds a value that can be read now.
    ///
    /// Deferred parameters still waiting for resolution are not counted.
    pub fn contains(&self, name: &str) -> bool {
        matches!(self.staging.get(name), Some(Staged::Ready(_)))
    }

    pub fn get(&self, name: &str) -> Result<&'a Value> {
        match self.staging.get(name) {
            Some(Staged::Ready(value)) => Ok(value),
            Some(Staged::Pending(_)) => Err(ConfigError::UnresolvedDependency {
                parameter: self.parameter.to_string(),
                dependency: name.to_string(),
            }),
            None => Err(ConfigError::UnknownKey(name.to_string())),
        }
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        value.as_i64().ok_or_else(|| mismatch(name, "int", value))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let value = self.get(name)?;
        value.as_f64().ok_or_else(|| mismatch(name, "float", value))
    }

    pub fn get_str(&self, name: &str) -> Result<&'a str> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "string", value))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
    }
}

pub(crate) fn mismatch(name: &str, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::TypeMismatch {
        parameter: name.to_string(),
        expected,
        found: found.kind(),
    }
}

/// Order in which deferred defaults are resolved.
///
/// Fails when a dependency names an undeclared parameter or when deferred
/// parameters depend on each other in a cycle.
pub(crate) fn resolution_order(registry: &ParameterRegistry) -> Result<Vec<String>> {
    let deferred: Vec<(&str, &Deferred)> = registry
        .iter()
        .filter_map(|spec| {
            spec.default_value()
                .and_then(|d| d.as_deferred())
                .map(|d| (spec.name(), d))
        })
        .collect();

    for (name, d) in &deferred {
        if let Some(dep) = d.dependencies().iter().find(|dep| !registry.contains(dep)) {
            return Err(ConfigError::UnknownDependency {
                parameter: name.to_string(),
                dependency: dep.clone(),
            });
        }
    }

    let mut order: Vec<String> = Vec::with_capacity(deferred.len());
    let mut pending: Vec<(&str, &Deferred)> = deferred.clone();
    while !pending.is_empty() {
        let ready = pending.iter().position(|(_, d)| {
            d.dependencies().iter().all(|dep| {
                !pending.iter().any(|(other, _)| *other == dep.as_str())
            })
        });
        match ready {
            Some(i) => order.push(pending.remove(i).0.to_string()),
            None => {
                return Err(ConfigError::DependencyCycle(
                    pending.iter().map(|(name, _)| name.to_string()).collect(),
                ))
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{DefaultValue, Shape};

    fn constant(n: i64) -> Deferred {
        Deferred::new(move |_| Ok(Value::Int(n)))
    }

    #[test]
    fn test_order_follows_declaration_without_dependencies() {
        let mut registry = ParameterRegistry::new();
        registry.declare_virtual("b", constant(1)).unwrap();
        registry.declare_virtual("a", constant(2)).unwrap();
        assert_eq!(resolution_order(&registry).unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_order_respects_dependencies() {
        let mut registry = ParameterRegistry::new();
        registry.declare("net", Shape::Scalar, "to_i".into()).unwrap();
        registry.declare_virtual("total", constant(0).after(["tax", "net"])).unwrap();
        registry.declare_virtual("tax", constant(0)).unwrap();
        registry
            .declare_default("label", DefaultValue::Deferred(constant(0).after(["total"])))
            .unwrap();
        assert_eq!(resolution_order(&registry).unwrap(), vec!["tax", "total", "label"]);
    }

    #[test]
    fn test_unknown_dependency() {
        let mut registry = ParameterRegistry::new();
        registry.declare_virtual("total", constant(0).after(["ghost"])).unwrap();
        let err = resolution_order(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDependency { dependency, .. } if dependency == "ghost"));
    }

    #[test]
    fn test_cycle() {
        let mut registry = ParameterRegistry::new();
        registry.declare_virtual("a", constant(0).after(["b"])).unwrap();
        registry.declare_virtual("b", constant(0).after(["a"])).unwrap();
        registry.declare_virtual("c", constant(0)).unwrap();
        match resolution_order(&registry).unwrap_err() {
            ConfigError::DependencyCycle(names) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_context_reads() {
        let mut staging = Staging::new();
        staging.insert("a", Staged::Ready(Value::Int(3)));
        staging.insert("s", Staged::Ready(Value::from("x")));
        staging.insert("later", Staged::Pending(constant(1)));

        let ctx = Context::new(&staging, "total");
        assert_eq!(ctx.parameter(), "total");
        assert_eq!(ctx.get_i64("a").unwrap(), 3);
        assert!(matches!(ctx.get_i64("s"), Err(ConfigError::TypeMismatch { .. })));
        assert!(matches!(ctx.get("nope"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            ctx.get("later"),
            Err(ConfigError::UnresolvedDependency { ref dependency, .. }) if dependency == "later"
        ));
    }

    #[test]
    fn test_contains_only_counts_resolved_values() {
        let mut staging = Staging::new();
        staging.insert("a", Staged::Ready(Value::Int(3)));
        staging.insert("later", Staged::Pending(constant(1)));

        let ctx = Context::new(&staging, "total");
        assert!(ctx.contains("a"));
        assert!(!ctx.contains("later"));
        assert!(!ctx.contains("nope"));
    }
}
