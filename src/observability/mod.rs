//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config::LogSource
//!     → logging.rs (apply: build handlers, or fall back)
//!     → LoggingContext (Dispatch + handler registry)
//!     → context.rs (ContextLogger tags env/team on every record)
//!
//! Each event:
//!     → record.rs (LogRecord)
//!     → format.rs (console/file lines) or gelf.rs (GELF JSON)
//!     → sink.rs (stdout, stderr, file, TCP)
//! ```
//!
//! # Design Decisions
//! - Logger names map onto tracing targets
//! - No global subscriber; the dispatcher travels with LoggingContext
//! - Setup never fails; a console-only fallback is always available

pub mod context;
pub mod format;
pub mod gelf;
pub mod logging;
pub mod record;
pub mod sink;

pub use context::ContextLogger;
pub use logging::{apply, configure, ConfigOrigin, Logger, LoggingContext};

/// Name of the job logger.
pub const LOGGER_NAME: &str = "test";
