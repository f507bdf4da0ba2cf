//! Whitespace-trimmed line lists.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::parsers::Parser;
use crate::schema::{ConfigError, Result};
use crate::value::{LazySeq, RawData, RawSeq};

/// Reads one element per non-blank line into a single sequence parameter.
///
/// Lines are never buffered: the sequence reads the source as it is consumed.
/// Sequences read from a file are restartable, each iteration reopens it.
#[derive(Debug, Clone)]
pub struct ListSlurper {
    name: String,
}

impl ListSlurper {
    /// Slurp into the parameter `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-shot sequence over `reader`.
    pub fn sequence<R>(reader: R) -> RawSeq
    where
        R: BufRead + Send + 'static,
    {
        LazySeq::once(elements(reader))
    }

    /// Restartable sequence over the file at `path`.
    ///
    /// A file that cannot be reopened on a later iteration yields a single
    /// [`ConfigError::Io`] element.
    pub fn file_sequence(path: &Path) -> Result<RawSeq> {
        File::open(path)?;
        let path: PathBuf = path.to_path_buf();
        Ok(LazySeq::restartable(move || -> Elements {
            match File::open(&path) {
                Ok(file) => Box::new(elements(BufReader::new(file))),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot reopen list");
                    Box::new(std::iter::once(Err(ConfigError::Io(e))))
                }
            }
        }))
    }
}

type Elements = Box<dyn Iterator<Item = Result<String>> + Send>;

/// Non-blank trimmed lines of `reader`.
///
/// Invalid UTF-8 is decoded lossily so the line still reaches the element
/// converter. The first I/O error is yielded and ends the sequence.
fn elements<R>(reader: R) -> impl Iterator<Item = Result<String>> + Send
where
    R: BufRead + Send + 'static,
{
    reader
        .split(b'\n')
        .scan(false, |failed, line| {
            if *failed {
                return None;
            }
            Some(match line {
                Ok(bytes) => {
                    let line = String::from_utf8_lossy(&bytes);
                    let line = line.trim();
                    (!line.is_empty()).then(|| Ok(line.to_string()))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "List read failed");
                    *failed = true;
                    Some(Err(ConfigError::Io(e)))
                }
            })
        })
        .flatten()
}

impl Parser for ListSlurper {
    fn read<R>(&self, reader: R) -> Result<RawData>
    where
        R: BufRead + Send + 'static,
    {
        let mut data = RawData::new();
        data.insert(self.name.as_str(), Self::sequence(reader));
        Ok(data)
    }

    fn read_file(&self, path: &Path) -> Result<RawData> {
        let mut data = RawData::new();
        data.insert(self.name.as_str(), Self::file_sequence(path)?);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;
    use std::io::{self, Cursor, Read};

    #[test]
    fn test_skips_blank_lines_and_trims() {
        let seq = ListSlurper::sequence(Cursor::new("  10.0.0.1 \n\n\t\n10.0.0.2\n"));
        let items: Vec<_> = seq.iter().unwrap().map(|item| item.unwrap()).collect();
        assert_eq!(items, vec!["10.0.0.1", "10.0.0.2"]);
        assert!(!seq.is_restartable());
    }

    #[test]
    fn test_read_produces_single_parameter() {
        let data = ListSlurper::new("iplist")
            .read(Cursor::new("a\nb\n"))
            .unwrap();
        assert_eq!(data.len(), 1);
        assert!(matches!(data.get("iplist"), Some(RawValue::Seq(_))));
    }

    #[test]
    fn test_file_sequence_restarts() {
        let path = std::env::temp_dir().join(format!("configfiles-list-{}.txt", std::process::id()));
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let seq = ListSlurper::file_sequence(&path).unwrap();
        assert!(seq.is_restartable());
        assert_eq!(seq.iter().unwrap().count(), 2);
        let items: Vec<_> = seq.iter().unwrap().map(|item| item.unwrap()).collect();
        assert_eq!(items, vec!["one", "two"]);

        std::fs::remove_file(&path).unwrap_or_default();
        let after: Vec<_> = seq.iter().unwrap().collect();
        assert_eq!(after.len(), 1);
        assert!(matches!(after[0], Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_utf8_line_is_kept() {
        let seq = ListSlurper::sequence(Cursor::new(b"10.0.0.1\n\xff\xfe\n10.0.0.2\r\n".to_vec()));
        let items: Vec<_> = seq.iter().unwrap().map(|item| item.unwrap()).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], "\u{fffd}\u{fffd}");
        assert_eq!(items[2], "10.0.0.2");
    }

    /// Yields `good`, then fails every read.
    struct FailingReader {
        good: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.good.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "device gone")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let reader = io::BufReader::new(FailingReader {
            good: Cursor::new(b"a\nb\n".to_vec()),
        });
        let items: Vec<_> = ListSlurper::sequence(reader).iter().unwrap().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_deref().unwrap(), "b");
        assert!(matches!(items[2], Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = ListSlurper::file_sequence(Path::new("/nonexistent/configfiles/list")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
