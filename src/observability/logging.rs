//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries
//! - Honour `RUST_LOG`, falling back to a caller-supplied filter
//!
//! # Design Decisions
//! - The library only emits `tracing` events; installing a subscriber is
//!   left to the binary
//! - Logs go to stderr so stdout stays free for command output

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "configfiles=info";

/// Install the global subscriber.
///
/// `verbose` lowers the fallback filter to debug. Returns an error if a
/// subscriber is already installed.
pub fn init(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let fallback = if verbose { "configfiles=debug" } else { DEFAULT_FILTER };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}
