//! Loaded configuration instances.
//!
//! # Responsibilities
//! - Run the load pipeline and commit its result atomically
//! - Run the validation hook and remember whether it passed
//! - Restrict reads and writes to the keys staged by the last load
//!
//! # Design Decisions
//! - Each load starts from an empty store; results are never merged
//! - A failed conversion leaves the previous data untouched
//! - A failed validation keeps the new data but marks the instance unvalidated

pub mod loader;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::schema::deferred::mismatch;
use crate::schema::{ConfigError, Result, Schema};
use crate::value::{OrderedMap, RawData, Value};

/// Switches for the optional load phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Fill absent parameters from declared defaults.
    pub compute_defaults: bool,

    /// Resolve virtual parameters and deferred defaults.
    pub compute_deferred: bool,

    /// Run the validation hook.
    pub validate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            compute_defaults: true,
            compute_deferred: true,
            validate: true,
        }
    }
}

/// Per-load data store of a [`Schema`].
#[derive(Debug, Clone)]
pub struct ConfigInstance {
    schema: Schema,
    data: OrderedMap<Value>,
    extras: OrderedMap<Value>,
    validated: bool,
}

impl ConfigInstance {
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            data: OrderedMap::new(),
            extras: OrderedMap::new(),
            validated: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn load(&mut self, raw: RawData) -> Result<()> {
        self.load_with(raw, LoadOptions::default())
    }

    /// Replace the data store with the result of loading `raw`.
    ///
    /// On a conversion error nothing changes. On a validation error the new
    /// data is kept but [`is_validated`](Self::is_validated) reports `false`.
    pub fn load_with(&mut self, raw: RawData, options: LoadOptions) -> Result<()> {
        let loaded = loader::run(&self.schema, raw, options)?;
        self.data = loaded.data;
        self.extras = loaded.extras;
        self.validated = false;

        if options.validate {
            self.validate()?;
        }

        tracing::info!(
            schema = %self.schema.name(),
            parameters = self.data.len(),
            extras = self.extras.len(),
            validated = self.validated,
            "Configuration loaded"
        );
        Ok(())
    }

    /// Run the validation hook over the current data.
    ///
    /// Without a hook every instance is valid.
    pub fn validate(&mut self) -> Result<()> {
        let outcome = match self.schema.validator() {
            Some(hook) => hook(&*self),
            None => Ok(()),
        };
        self.validated = outcome.is_ok();
        outcome.map_err(|err| {
            tracing::warn!(schema = %self.schema.name(), error = %err, "Validation failed");
            ConfigError::ValidationFailed(err)
        })
    }

    /// Whether the current data passed validation since it was last changed.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.data
            .get(name)
            .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))
    }

    /// Overwrite a value staged by the last load.
    ///
    /// New keys are rejected. The instance needs validating again afterwards.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self
            .data
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))?;
        *slot = value.into();
        self.validated = false;
        Ok(())
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        value.as_i64().ok_or_else(|| mismatch(name, "int", value))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let value = self.get(name)?;
        value.as_f64().ok_or_else(|| mismatch(name, "float", value))
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "string", value))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// (name, value) pairs in load order.
    pub fn each(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter()
    }

    /// Value accepted by policy for a name the schema does not declare.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extras.get(name)
    }

    pub fn extras(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extras.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop all loaded data.
    pub fn flush(&mut self) {
        self.data.clear();
        self.extras.clear();
        self.validated = false;
    }
}

/// Declared values first, then extras.
impl Serialize for ConfigInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.data.len() + self.extras.len()))?;
        for (name, value) in self.data.iter().chain(self.extras.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
