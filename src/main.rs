//! configfiles demo
//!
//! Loads a configuration file against a sample schema and prints the
//! resulting instance as JSON.
//!
//! ```text
//! configfiles server.conf --iplist allowed.txt
//! configfiles server.toml --format toml --strict
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use configfiles::observability::logging;
use configfiles::parsers::{KeyValueParser, ListSlurper, Parser as _, TomlParser};
use configfiles::{BoxError, ConfigError, Deferred, LoadOptions, RawData, Schema, Value, ValueTable};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// `name = value` lines
    KeyValue,
    Toml,
}

#[derive(Parser)]
#[command(name = "configfiles")]
#[command(about = "Load a configuration file against the sample schema", long_about = None)]
struct Cli {
    /// Configuration file
    file: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Format::KeyValue)]
    format: Format,

    /// File with one IP address per line, loaded as `iplist`
    #[arg(long)]
    iplist: Option<PathBuf>,

    /// Reject parameters the schema does not declare
    #[arg(long)]
    strict: bool,

    /// Skip the validation hook
    #[arg(long)]
    no_validate: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn sample_schema(strict: bool) -> configfiles::Result<Schema> {
    let mut builder = Schema::builder("sample");
    builder
        .parameter("par_integer", "to_i")?
        .parameter("par_str", "strip")?
        .parameter("par_custom", "length")?
        .parameter(
            "level",
            ValueTable::new().with("low", 1).with("medium", 5).with("high", 10),
        )?
        .default("level", 1)?
        .enumerator_with("iplist", |s| {
            let addr: IpAddr = s.parse()?;
            Ok(Value::Str(addr.to_string()))
        })?
        .virtual_parameter(
            "weight",
            Deferred::new(|ctx| {
                let base = if ctx.contains("par_integer") { ctx.get_i64("par_integer")? } else { 0 };
                Ok(Value::Int(base * ctx.get_i64("level")?))
            }),
        )?;
    if strict {
        builder.on("unknown_parameter", "fail")?;
    }
    builder.validate(|config| {
        if config.get_i64("par_custom")? > 100 {
            return Err(BoxError::from("par_custom must not exceed 100 characters"));
        }
        if config.get_str("par_str")?.is_empty() {
            return Err(BoxError::from("par_str must not be blank"));
        }
        Ok(())
    });
    builder.build()
}

fn report(err: &ConfigError) {
    let stage = if err.is_declaration_error() { "declaration" } else { "load" };
    tracing::error!(stage, error = %err, "Configuration failed");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let schema = sample_schema(cli.strict).inspect_err(report)?;

    let mut raw: RawData = match cli.format {
        Format::KeyValue => KeyValueParser::new().read_file(&cli.file)?,
        Format::Toml => TomlParser::new().read_file(&cli.file)?,
    };
    if let Some(path) = &cli.iplist {
        raw.extend(ListSlurper::new("iplist").read_file(path)?);
    }

    let options = LoadOptions {
        validate: !cli.no_validate,
        ..LoadOptions::default()
    };
    let config = schema.load_with(raw, options).inspect_err(report)?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
