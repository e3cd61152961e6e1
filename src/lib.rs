//! Athena batch job.
//!
//! A scheduled job that configures logging, fetches its properties from the
//! Athena configuration service for one (environment, team) profile, and
//! exits with a status code describing the run.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv ──▶ cli ──▶ job::JobRunner ──────────────────────────▶ exit code
//!                        │        │
//!                        │        └──▶ athena (GET {url}/test/{team},{env})
//!                        ▼
//!                  config::resolver ──▶ observability (handlers, context logger)
//! ```

pub mod athena;
pub mod cli;
pub mod config;
pub mod job;
pub mod observability;

pub use athena::{AthenaClient, AthenaClientFactory};
pub use cli::Cli;
pub use job::{ExitOutcome, JobRunner, RunContext};
