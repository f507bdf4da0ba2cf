//! `name = value` line parser.

use std::io::BufRead;

use crate::parsers::Parser;
use crate::schema::{ConfigError, Result};
use crate::value::RawData;

/// Reads `name = value` lines.
///
/// Blank lines and lines starting with `#` or `;` are skipped. Values may be
/// wrapped in matching single or double quotes. A repeated name keeps its
/// last value.
#[derive(Debug, Clone, Default)]
pub struct KeyValueParser {
    strict: bool,
}

impl KeyValueParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on malformed lines instead of skipping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn parse_line(line: &str) -> std::result::Result<Option<(&str, &str)>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            return Ok(None);
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| "expected 'name = value'".to_string())?;
        let key = key.trim();
        if key.is_empty() || !key.chars().all(is_key_char) {
            return Err(format!("invalid parameter name '{}'", key));
        }
        Ok(Some((key, unquote(value.trim()))))
    }
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

impl Parser for KeyValueParser {
    fn read<R>(&self, reader: R) -> Result<RawData>
    where
        R: BufRead + Send + 'static,
    {
        let mut data = RawData::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            match Self::parse_line(&line) {
                Ok(Some((key, value))) => {
                    data.insert(key, value);
                }
                Ok(None) => {}
                Err(message) if self.strict => {
                    return Err(ConfigError::Parse {
                        line: i + 1,
                        message,
                    })
                }
                Err(message) => tracing::debug!(line = i + 1, %message, "Skipping line"),
            }
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;
    use std::io::Cursor;

    fn read(parser: &KeyValueParser, text: &'static str) -> Result<RawData> {
        parser.read(Cursor::new(text))
    }

    #[test]
    fn test_reads_pairs() {
        let text = "# comment\nport = 9090\n\nname=\"web server\"\nlevel = high\nport = 9091\n";
        let data = read(&KeyValueParser::new(), text).unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["port", "name", "level"]);
        assert_eq!(data.get("port").and_then(RawValue::as_str), Some("9091"));
        assert_eq!(data.get("name").and_then(RawValue::as_str), Some("web server"));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let data = read(&KeyValueParser::new(), "name =\n").unwrap();
        assert_eq!(data.get("name").and_then(RawValue::as_str), Some(""));
    }

    #[test]
    fn test_lenient_skips_garbage() {
        let data = read(&KeyValueParser::new(), "garbage\nport = 1\n").unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_strict_reports_line() {
        let err = read(&KeyValueParser::new().strict(), "port = 1\nbad key = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }
}
