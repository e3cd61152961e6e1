//! Batch job subsystem.
//!
//! # Data Flow
//! ```text
//! Cli (env, team)
//!     → context.rs (RunContext, profile key "team,env")
//!     → runner.rs (JobRunner: logging → fetch → lookup → close)
//!     → outcome.rs (RunError → ExitOutcome → exit code)
//! ```
//!
//! # Design Decisions
//! - The run body returns `Result<(), RunError>`; only the runner maps it
//!   to an exit code
//! - Panics inside the run body are caught and treated as unhandled failures

pub mod context;
pub mod outcome;
pub mod runner;

pub use context::{Environment, RunContext, Team};
pub use outcome::{ExitOutcome, FailureCause, RunError};
pub use runner::JobRunner;
