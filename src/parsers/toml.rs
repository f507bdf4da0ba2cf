//! TOML documents as raw data.

use std::io::BufRead;

use crate::parsers::Parser;
use crate::schema::Result;
use crate::value::{LazySeq, RawData};

/// Flattens a TOML document into raw strings.
///
/// - scalars become their string form
/// - arrays become restartable sequences of element strings
/// - nested tables become dotted names (`server.port`)
#[derive(Debug, Clone, Default)]
pub struct TomlParser;

impl TomlParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_str(&self, content: &str) -> Result<RawData> {
        let table: toml::Table = content.parse()?;
        let mut data = RawData::new();
        flatten(None, table, &mut data);
        Ok(data)
    }
}

fn flatten(prefix: Option<&str>, table: toml::Table, out: &mut RawData) {
    for (key, value) in table {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            toml::Value::Table(nested) => flatten(Some(name.as_str()), nested, out),
            toml::Value::Array(items) => {
                let items: Vec<String> = items.into_iter().map(scalar).collect();
                out.insert(name, LazySeq::restartable(move || items.clone()));
            }
            other => {
                out.insert(name, scalar(other));
            }
        }
    }
}

fn scalar(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        toml::Value::Integer(n) => n.to_string(),
        toml::Value::Float(x) => x.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        nested => nested.to_string(),
    }
}

impl Parser for TomlParser {
    fn read<R>(&self, mut reader: R) -> Result<RawData>
    where
        R: BufRead + Send + 'static,
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        self.parse_str(&content)
    }
}
