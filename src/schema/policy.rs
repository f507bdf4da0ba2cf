//! Policies for unexpected input.
//!
//! # Circumstances
//! - `unknown_parameter`: raw data names a parameter without a converter
//! - `unknown_value`: a table converter receives a string outside its keys
//!
//! # Defaults
//! - `unknown_parameter` → ignore
//! - `unknown_value` → fail

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::schema::types::{BoxError, ConfigError, Result};
use crate::value::{RawValue, Value};

/// A situation the loader may run into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Circumstance {
    UnknownParameter,
    UnknownValue,
}

impl Circumstance {
    pub const ALL: [Circumstance; 2] = [Circumstance::UnknownParameter, Circumstance::UnknownValue];

    pub fn name(&self) -> &'static str {
        match self {
            Circumstance::UnknownParameter => "unknown_parameter",
            Circumstance::UnknownValue => "unknown_value",
        }
    }
}

impl FromStr for Circumstance {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Circumstance::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ConfigError::InvalidPolicy(format!("unknown circumstance '{}'", s)))
    }
}

impl fmt::Display for Circumstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Custom resolver for a circumstance; receives the offending raw value.
pub type PolicyFn = Arc<dyn Fn(RawValue) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// What to do when a circumstance arises.
#[derive(Clone)]
pub enum Action {
    /// Pass the raw value through unchanged.
    Accept,
    /// Drop the value silently.
    Ignore,
    /// Abort the load.
    Fail,
    /// Replace the value with the function's result.
    Custom(PolicyFn),
}

impl Action {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(RawValue) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Action::Custom(Arc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Ignore => "ignore",
            Action::Fail => "fail",
            Action::Custom(_) => "custom",
        }
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accept" => Ok(Action::Accept),
            "ignore" => Ok(Action::Ignore),
            "fail" => Ok(Action::Fail),
            other => Err(ConfigError::InvalidPolicy(format!("unknown action '{}'", other))),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action per circumstance, owned by one schema.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    unknown_parameter: Action,
    unknown_value: Action,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self {
            unknown_parameter: Action::Ignore,
            unknown_value: Action::Fail,
        }
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_policy(&mut self, circumstance: Circumstance, action: Action) {
        match circumstance {
            Circumstance::UnknownParameter => self.unknown_parameter = action,
            Circumstance::UnknownValue => self.unknown_value = action,
        }
    }

    /// String form of [`set_policy`](Self::set_policy), e.g. `on("unknown_value", "accept")`.
    pub fn on(&mut self, circumstance: &str, action: &str) -> Result<()> {
        let circumstance = circumstance.parse()?;
        let action = action.parse()?;
        self.set_policy(circumstance, action);
        Ok(())
    }

    pub fn policy_for(&self, circumstance: Circumstance) -> &Action {
        match circumstance {
            Circumstance::UnknownParameter => &self.unknown_parameter,
            Circumstance::UnknownValue => &self.unknown_value,
        }
    }
}
