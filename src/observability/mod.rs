//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! schema build, load phases, policy decisions
//!     → tracing events (debug per phase, info per load, warn on validation failure)
//!     → logging.rs subscriber (binaries only)
//! ```

pub mod logging;
