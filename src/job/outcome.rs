//! Run errors and their mapping onto process exit codes.

use thiserror::Error;

use crate::athena::AthenaError;

/// Why a run body failed.
#[derive(Debug, Error)]
pub enum RunError {
    /// The configuration service returned no properties.
    #[error("Can't get athena properties for profile {profiles}. Check environment variable ATHENA_SECRET.")]
    ConfigurationUnavailable { profiles: String },

    /// Anything else that went wrong while running.
    #[error("Unhandled exception occurred: {0}")]
    UnhandledFailure(#[source] FailureCause),
}

/// Underlying cause of an unhandled failure.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Athena(#[from] AthenaError),

    #[error("panicked: {0}")]
    Panic(String),
}

impl From<AthenaError> for RunError {
    fn from(err: AthenaError) -> Self {
        RunError::UnhandledFailure(FailureCause::Athena(err))
    }
}

/// Final outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    ConfigurationUnavailable,
    UnhandledFailure,
}

impl ExitOutcome {
    /// Process exit code. Both failure kinds share code 1.
    pub fn code(&self) -> u8 {
        match self {
            ExitOutcome::Success => 0,
            ExitOutcome::ConfigurationUnavailable => 1,
            ExitOutcome::UnhandledFailure => 1,
        }
    }
}

impl From<&Result<(), RunError>> for ExitOutcome {
    fn from(result: &Result<(), RunError>) -> Self {
        match result {
            Ok(()) => ExitOutcome::Success,
            Err(RunError::ConfigurationUnavailable { .. }) => ExitOutcome::ConfigurationUnavailable,
            Err(RunError::UnhandledFailure(_)) => ExitOutcome::UnhandledFailure,
        }
    }
}
