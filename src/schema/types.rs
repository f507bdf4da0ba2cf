//! Schema error definitions.

use thiserror::Error;

/// Error returned by user-supplied converters, resolvers and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while declaring a schema, loading raw data or accessing an instance.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A stored value has a different type than the caller asked for.
    #[error("Parameter '{parameter}' holds a {found}, expected {expected}")]
    TypeMismatch {
        parameter: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A converter was declared twice for the same parameter.
    #[error("Parameter '{0}' already has a converter")]
    DuplicateParameter(String),

    /// A default was declared twice for the same parameter.
    #[error("Parameter '{0}' already has a default")]
    DuplicateDefault(String),

    /// Converter declaration is ambiguous or names an unknown operation.
    #[error("Invalid declaration for parameter '{parameter}': {reason}")]
    Argument { parameter: String, reason: String },

    /// Unrecognized circumstance or action in a policy declaration.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Raw data names a parameter without a converter and the policy is `fail`.
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    /// Table lookup missed and the policy is `fail`.
    #[error("Unknown value '{value}' for parameter '{parameter}', expected one of: {}", .allowed.join(", "))]
    UnknownValue {
        parameter: String,
        value: String,
        allowed: Vec<String>,
    },

    /// A raw value was supplied for a virtual parameter.
    #[error("Parameter '{0}' is virtual and cannot be supplied")]
    VirtualParameterSupplied(String),

    /// Instance access with a name outside the data store.
    #[error("Unknown key '{0}'")]
    UnknownKey(String),

    /// The validation hook rejected the instance.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[source] BoxError),

    /// A named or custom converter rejected its input.
    #[error("Cannot convert parameter '{parameter}': {source}")]
    Conversion {
        parameter: String,
        #[source]
        source: BoxError,
    },

    /// Scalar given where a sequence is expected, or the other way round.
    #[error("Parameter '{parameter}' expects a {expected}")]
    ShapeMismatch {
        parameter: String,
        expected: &'static str,
    },

    /// A deferred parameter depends on a name the schema never declared.
    #[error("Parameter '{parameter}' depends on undeclared parameter '{dependency}'")]
    UnknownDependency { parameter: String, dependency: String },

    /// Deferred parameters depend on each other in a loop.
    #[error("Dependency cycle between deferred parameters: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// A resolver read a deferred parameter it did not declare as a dependency.
    #[error("Parameter '{parameter}' read unresolved parameter '{dependency}'")]
    UnresolvedDependency { parameter: String, dependency: String },

    /// A one-shot sequence was iterated a second time.
    #[error("Sequence already consumed")]
    SequenceConsumed,

    /// Malformed collaborator input.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Wrap an error returned by user code for `parameter`.
    ///
    /// Errors that already are a [`ConfigError`] are passed through unchanged.
    pub fn from_user(parameter: &str, source: BoxError) -> Self {
        match source.downcast::<ConfigError>() {
            Ok(err) => *err,
            Err(source) => ConfigError::Conversion {
                parameter: parameter.to_string(),
                source,
            },
        }
    }

    /// True for errors raised while declaring a schema.
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            ConfigError::DuplicateParameter(_)
                | ConfigError::DuplicateDefault(_)
                | ConfigError::Argument { .. }
                | ConfigError::InvalidPolicy(_)
                | ConfigError::UnknownDependency { .. }
                | ConfigError::DependencyCycle(_)
        )
    }
}
