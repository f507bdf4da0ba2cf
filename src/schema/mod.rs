//! Schema declaration.
//!
//! # Data Flow
//! ```text
//! SchemaBuilder (parameter / enumerator / default / virtual_parameter / on / validate)
//!     → registry.rs   (name → converter, default, virtual flag)
//!     → converter.rs  (identity, named operation, table, custom)
//!     → policy.rs     (unknown_parameter, unknown_value)
//!     → deferred.rs   (resolution order of computed values)
//!     → Schema        (immutable, shared via Arc by every load)
//! ```
//!
//! # Design Decisions
//! - Declaration happens on the builder only; a built `Schema` cannot be
//!   mutated, so every load sees a frozen registry and policy store
//! - `Schema` is cheap to clone and `Send + Sync`: concurrent loads into
//!   different instances share it read-only
//! - Declaration errors are returned, not panicked; callers are expected to
//!   abort setup on them

pub mod converter;
pub mod deferred;
pub mod policy;
pub mod registry;
pub mod types;

use std::fmt;
use std::sync::Arc;

pub use converter::{Converter, NamedOp, ParamDecl, ValueTable};
pub use deferred::{Context, Deferred};
pub use policy::{Action, Circumstance, PolicyStore};
pub use registry::{DefaultValue, ParameterRegistry, ParameterSpec, Shape};
pub use types::{BoxError, ConfigError, Result};

use crate::instance::{ConfigInstance, LoadOptions};
use crate::value::{RawData, RawValue, Value};

/// Validation hook run once per load over the finished instance.
pub type ValidateFn =
    Arc<dyn Fn(&ConfigInstance) -> std::result::Result<(), BoxError> + Send + Sync>;

struct SchemaInner {
    name: String,
    registry: ParameterRegistry,
    policies: PolicyStore,
    validator: Option<ValidateFn>,
    resolution_order: Vec<String>,
}

/// A frozen schema: registry, policies, validation hook.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.inner.registry
    }

    pub fn policies(&self) -> &PolicyStore {
        &self.inner.policies
    }

    pub fn policy_for(&self, circumstance: Circumstance) -> &Action {
        self.inner.policies.policy_for(circumstance)
    }

    pub(crate) fn validator(&self) -> Option<&ValidateFn> {
        self.inner.validator.as_ref()
    }

    /// Deferred parameters in the order they are resolved.
    pub fn resolution_order(&self) -> &[String] {
        &self.inner.resolution_order
    }

    /// An empty instance bound to this schema.
    pub fn instance(&self) -> ConfigInstance {
        ConfigInstance::new(self)
    }

    /// Load `raw` into a fresh instance with default options.
    pub fn load(&self, raw: RawData) -> Result<ConfigInstance> {
        self.load_with(raw, LoadOptions::default())
    }

    pub fn load_with(&self, raw: RawData, options: LoadOptions) -> Result<ConfigInstance> {
        let mut instance = self.instance();
        instance.load_with(raw, options)?;
        Ok(instance)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.inner.name)
            .field("registry", &self.inner.registry)
            .field("policies", &self.inner.policies)
            .field("validator", &self.inner.validator.is_some())
            .finish()
    }
}

/// Declaration surface of a [`Schema`].
///
/// Methods return `&mut Self` so that declarations chain with `?`:
///
/// ```
/// use configfiles::{RawData, Schema, ValueTable};
///
/// let mut builder = Schema::builder("server");
/// builder
///     .parameter("port", "to_i")?
///     .parameter("level", ValueTable::new().with("low", 1).with("high", 2))?
///     .default("port", 8080)?;
/// let schema = builder.build()?;
///
/// let raw: RawData = [("level", "high")].into_iter().collect();
/// let config = schema.load(raw)?;
/// assert_eq!(config.get_i64("port")?, 8080);
/// assert_eq!(config.get_i64("level")?, 2);
/// # Ok::<(), configfiles::ConfigError>(())
/// ```
pub struct SchemaBuilder {
    name: String,
    registry: ParameterRegistry,
    policies: PolicyStore,
    validator: Option<ValidateFn>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: ParameterRegistry::new(),
            policies: PolicyStore::new(),
            validator: None,
        }
    }

    /// Declare a scalar parameter.
    pub fn parameter(&mut self, name: &str, decl: impl Into<ParamDecl>) -> Result<&mut Self> {
        self.registry.declare(name, Shape::Scalar, decl.into())?;
        Ok(self)
    }

    /// Declare a scalar parameter with a custom converter.
    pub fn parameter_with<F>(&mut self, name: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.parameter(name, ParamDecl::new().custom(f))
    }

    /// Declare a sequence parameter; `decl` converts each element.
    pub fn enumerator(&mut self, name: &str, decl: impl Into<ParamDecl>) -> Result<&mut Self> {
        self.registry.declare(name, Shape::Sequence, decl.into())?;
        Ok(self)
    }

    pub fn enumerator_with<F>(&mut self, name: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.enumerator(name, ParamDecl::new().custom(f))
    }

    pub fn default(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.registry
            .declare_default(name, DefaultValue::Literal(value.into()))?;
        Ok(self)
    }

    /// Declare a default computed from the loaded data.
    pub fn default_deferred(&mut self, name: &str, deferred: Deferred) -> Result<&mut Self> {
        self.registry
            .declare_default(name, DefaultValue::Deferred(deferred))?;
        Ok(self)
    }

    /// Declare a parameter that is always computed and never read from input.
    pub fn virtual_parameter(&mut self, name: &str, resolver: Deferred) -> Result<&mut Self> {
        self.registry.declare_virtual(name, resolver)?;
        Ok(self)
    }

    /// Set a policy from its string form, e.g. `on("unknown_parameter", "fail")`.
    pub fn on(&mut self, circumstance: &str, action: &str) -> Result<&mut Self> {
        self.policies.on(circumstance, action)?;
        Ok(self)
    }

    /// Set a custom resolver for a circumstance.
    pub fn on_with<F>(&mut self, circumstance: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(RawValue) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        let circumstance: Circumstance = circumstance.parse()?;
        self.policies.set_policy(circumstance, Action::custom(f));
        Ok(self)
    }

    pub fn policy(&mut self, circumstance: Circumstance, action: Action) -> &mut Self {
        self.policies.set_policy(circumstance, action);
        self
    }

    /// Install the validation hook, replacing any previous one.
    pub fn validate<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&ConfigInstance) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        if self.validator.is_some() {
            tracing::debug!(schema = %self.name, "Replacing validation hook");
        }
        self.validator = Some(Arc::new(f));
        self
    }

    /// Freeze the declarations.
    ///
    /// Fails when deferred dependencies are undeclared or cyclic.
    pub fn build(self) -> Result<Schema> {
        let resolution_order = deferred::resolution_order(&self.registry)?;
        if self.registry.is_empty() {
            tracing::warn!(schema = %self.name, "Schema declares no parameters");
        }
        tracing::debug!(
            schema = %self.name,
            parameters = self.registry.len(),
            deferred = resolution_order.len(),
            "Schema built"
        );
        Ok(Schema {
            inner: Arc::new(SchemaInner {
                name: self.name,
                registry: self.registry,
                policies: self.policies,
                validator: self.validator,
                resolution_order,
            }),
        })
    }
}
