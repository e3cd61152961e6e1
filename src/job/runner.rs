//! Job runner: the single top-level error boundary of a run.
//!
//! # Responsibilities
//! - Set up logging and bind the run's context to it
//! - Fetch the profile's properties and read the one the job needs
//! - Turn every failure, panics included, into an [`ExitOutcome`]
//! - Close every logging handler exactly once, whatever happened

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::instrument::WithSubscriber;

use crate::athena::{PropertySource, PropertySourceFactory};
use crate::config::resolver::LogConfigResolver;
use crate::job::context::RunContext;
use crate::job::outcome::{ExitOutcome, FailureCause, RunError};
use crate::observability::{configure, ContextLogger};

/// Job name presented to the configuration service.
pub const JOB_NAME: &str = "test";

/// Property read from the fetched configuration.
pub const PROPERTY_NAME: &str = "property.name";

/// Runs the job once per [`RunContext`].
#[derive(Debug, Clone)]
pub struct JobRunner<F> {
    resolver: LogConfigResolver,
    factory: F,
}

impl<F> JobRunner<F>
where
    F: PropertySourceFactory,
{
    pub fn new(resolver: LogConfigResolver, factory: F) -> Self {
        Self { resolver, factory }
    }

    /// Run the job and report how it ended.
    ///
    /// Never panics and never returns early: logging handlers are closed
    /// on every path before the outcome is returned.
    pub async fn run(&self, context: &RunContext) -> ExitOutcome {
        let mut logging = configure(&self.resolver);
        let logger = ContextLogger::new(logging.logger(), context);

        let result = AssertUnwindSafe(
            self.execute(context, &logger)
                .with_subscriber(logging.dispatch().clone()),
        )
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(RunError::UnhandledFailure(FailureCause::Panic(panic_message(
                payload.as_ref(),
            ))))
        });

        if let Err(err) = &result {
            if matches!(err, RunError::UnhandledFailure(_)) {
                logger.exception(err);
            }
        }

        let outcome = ExitOutcome::from(&result);
        logging.close();
        outcome
    }

    async fn execute(&self, context: &RunContext, logger: &ContextLogger) -> Result<(), RunError> {
        logger.info(" **** Starting test ***");

        let profiles = context.profile_key();
        let source = self.factory.connect(
            JOB_NAME,
            context.environment(),
            context.team(),
            &profiles,
        )?;

        let Some(properties) = source.get_properties().await? else {
            let err = RunError::ConfigurationUnavailable { profiles };
            logger.error(&err);
            return Err(err);
        };

        let value = source.get_property_value(PROPERTY_NAME, &properties);
        logger.info(format_args!(
            "Property value: {}",
            value.as_deref().unwrap_or("<none>")
        ));

        logger.info(" **** Finished test ***");
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
