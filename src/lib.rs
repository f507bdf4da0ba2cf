//! Declarative configuration schemas.
//!
//! A [`Schema`] declares parameters once: how each raw string is converted,
//! what default applies when it is missing, which values are computed from
//! the others, and what happens with input the schema does not expect.
//! Parsers turn files into [`RawData`]; loading that data through the
//! schema yields a checked, typed [`ConfigInstance`].
//!
//! ```text
//! parsers (key = value, lists, TOML)
//!     → RawData
//!     → Schema::load: convert → defaults → deferred → validate
//!     → ConfigInstance
//! ```

pub mod instance;
pub mod observability;
pub mod parsers;
pub mod schema;
pub mod value;

pub use instance::{ConfigInstance, LoadOptions};
pub use schema::{
    Action, BoxError, Circumstance, ConfigError, Context, Deferred, NamedOp, ParamDecl, Result,
    Schema, SchemaBuilder, ValueTable,
};
pub use value::{LazySeq, RawData, RawSeq, RawValue, Sequence, Value};
