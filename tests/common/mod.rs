//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use configfiles::{RawData, Schema, SchemaBuilder, ValueTable};

/// Build raw data from string pairs.
pub fn raw(pairs: &[(&str, &str)]) -> RawData {
    pairs.iter().copied().collect()
}

pub fn levels() -> ValueTable {
    ValueTable::new().with("low", 1).with("high", 2)
}

/// `port` (to_i, default 8080) and `level` (low/high table).
pub fn server_builder() -> SchemaBuilder {
    let mut builder = Schema::builder("server");
    builder
        .parameter("port", "to_i")
        .unwrap()
        .parameter("level", levels())
        .unwrap()
        .default("port", 8080)
        .unwrap();
    builder
}

pub fn server_schema() -> Schema {
    server_builder().build().unwrap()
}

/// Write `content` to a unique file under the system temp dir.
pub fn temp_file(name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = std::env::temp_dir().join(format!("configfiles-{}-{}", std::process::id(), name));
    std::fs::write(&path, content).unwrap();
    path
}
