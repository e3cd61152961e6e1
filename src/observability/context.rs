//! Context-aware logger.
//!
//! Wraps the job [`Logger`] and stamps `env` and `team` on every record. The
//! handlers underneath are the same ones the base logger writes to.

use std::error::Error;
use std::fmt::Display;
use std::panic::Location;

use crate::job::{Environment, RunContext, Team};
use crate::observability::logging::Logger;
use crate::observability::LOGGER_NAME;

/// Logger adapter carrying the run's environment and team.
#[derive(Debug, Clone)]
pub struct ContextLogger {
    logger: Logger,
    env: Environment,
    team: Team,
}

impl ContextLogger {
    pub fn new(logger: Logger, context: &RunContext) -> Self {
        Self {
            logger,
            env: context.environment(),
            team: context.team(),
        }
    }

    #[track_caller]
    pub fn info(&self, message: impl Display) {
        let caller = Location::caller();
        self.logger.in_scope(|| {
            tracing::info!(
                target: LOGGER_NAME,
                caller_file = caller.file(),
                caller_line = caller.line(),
                env = %self.env,
                team = %self.team,
                "{}",
                message
            )
        });
    }

    #[track_caller]
    pub fn warn(&self, message: impl Display) {
        let caller = Location::caller();
        self.logger.in_scope(|| {
            tracing::warn!(
                target: LOGGER_NAME,
                caller_file = caller.file(),
                caller_line = caller.line(),
                env = %self.env,
                team = %self.team,
                "{}",
                message
            )
        });
    }

    #[track_caller]
    pub fn error(&self, message: impl Display) {
        let caller = Location::caller();
        self.logger.in_scope(|| {
            tracing::error!(
                target: LOGGER_NAME,
                caller_file = caller.file(),
                caller_line = caller.line(),
                env = %self.env,
                team = %self.team,
                "{}",
                message
            )
        });
    }

    /// Log an error at ERROR level together with its chain of causes.
    #[track_caller]
    pub fn exception(&self, err: &(dyn Error + 'static)) {
        let caller = Location::caller();
        let causes = cause_chain(err);
        self.logger.in_scope(|| {
            if causes.is_empty() {
                tracing::error!(
                    target: LOGGER_NAME,
                    caller_file = caller.file(),
                    caller_line = caller.line(),
                    env = %self.env,
                    team = %self.team,
                    "{}",
                    err
                )
            } else {
                tracing::error!(
                    target: LOGGER_NAME,
                    caller_file = caller.file(),
                    caller_line = caller.line(),
                    env = %self.env,
                    team = %self.team,
                    caused_by = %causes,
                    "{}",
                    err
                )
            }
        });
    }
}

/// Every source below `err`, outermost first, joined with ` <- `.
fn cause_chain(err: &(dyn Error + 'static)) -> String {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes.join(" <- ")
}
