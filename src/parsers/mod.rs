//! Parser collaborators.
//!
//! # Responsibilities
//! - Turn a line/byte source into [`RawData`]
//! - Leave all typing to the schema: every value is a string or a lazy
//!   sequence of strings
//!
//! # Parsers
//! - `key_value.rs`: `name = value` lines
//! - `list.rs`: one element per non-blank line
//! - `toml.rs`: TOML documents, flattened to dotted names

pub mod key_value;
pub mod list;
pub mod toml;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::schema::Result;
use crate::value::RawData;

pub use key_value::KeyValueParser;
pub use list::ListSlurper;
pub use self::toml::TomlParser;

/// A source of raw configuration data.
pub trait Parser {
    /// Parse everything `reader` yields.
    fn read<R>(&self, reader: R) -> Result<RawData>
    where
        R: BufRead + Send + 'static;

    fn read_file(&self, path: &Path) -> Result<RawData> {
        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "Reading configuration file");
        self.read(BufReader::new(file))
    }
}
