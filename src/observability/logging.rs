//! Structured logging.
//!
//! # Responsibilities
//! - Turn a resolved [`LogSource`] into a working tracing dispatcher
//! - Fall back to a console-only configuration when anything goes wrong
//! - Own the handler registry and release it at shutdown
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; logger names are targets
//! - One layer per handler, each behind its own `Targets` filter
//! - Logger names match targets by string prefix, so `test` also covers
//!   `test::child` (and, unlike dotted logger hierarchies, `testing`). Job
//!   events use the exact target `test`; crate targets use `::` paths and
//!   only ever fall under the root entry
//! - The dispatcher is held by [`LoggingContext`] and passed explicitly, no
//!   global default is installed

use std::fmt::Display;
use std::io;
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::Registry;

use crate::config::loader::{load_logging_config, ConfigError};
use crate::config::resolver::{LogConfigResolver, LogSource};
use crate::config::schema::LoggingConfig;
use crate::config::validation::{validate_config, HandlerKind, HandlerSpec, LoggingSpec};
use crate::observability::gelf::GelfLayer;
use crate::observability::sink::SinkHandle;
use crate::observability::LOGGER_NAME;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Why a logging configuration could not be applied.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("handler '{handler}' could not be opened: {source}")]
    Handler {
        handler: String,
        #[source]
        source: io::Error,
    },
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    BuiltinDefault,
    Fallback,
}

/// Active logging state: the dispatcher plus every handler it writes to.
#[derive(Debug)]
pub struct LoggingContext {
    dispatch: Dispatch,
    root_handlers: Vec<SinkHandle>,
    job_handlers: Vec<SinkHandle>,
    other_handlers: Vec<SinkHandle>,
    origin: ConfigOrigin,
    closed: bool,
}

impl LoggingContext {
    /// Logger bound to the job's logger name.
    pub fn logger(&self) -> Logger {
        Logger { dispatch: self.dispatch.clone() }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn origin(&self) -> &ConfigOrigin {
        &self.origin
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Flush and close the root logger's handlers, then the job logger's,
    /// then any others. Returns how many handlers this call closed.
    pub fn close(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;

        let handlers = self
            .root_handlers
            .iter()
            .chain(&self.job_handlers)
            .chain(&self.other_handlers);

        let mut count = 0;
        for handle in handlers {
            handle.sink().flush();
            if handle.sink().close() {
                count += 1;
            }
        }
        count
    }
}

impl Drop for LoggingContext {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle for the job logger (`"test"`).
#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Run `f` with this logger's dispatcher as the default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        let caller = Location::caller();
        self.in_scope(|| {
            tracing::debug!(target: LOGGER_NAME, caller_file = caller.file(), caller_line = caller.line(), "{}", message)
        });
    }

    #[track_caller]
    pub fn info(&self, message: impl Display) {
        let caller = Location::caller();
        self.in_scope(|| {
            tracing::info!(target: LOGGER_NAME, caller_file = caller.file(), caller_line = caller.line(), "{}", message)
        });
    }
}

/// Resolve the source with `resolver` and apply it.
pub fn configure(resolver: &LogConfigResolver) -> LoggingContext {
    apply(resolver.resolve())
}

/// Apply a logging source. Never fails: any problem installs the fallback.
pub fn apply(source: LogSource) -> LoggingContext {
    let attempt = match &source {
        LogSource::Path(path) => load_logging_config(path)
            .map_err(SetupError::from)
            .and_then(|spec| install(&spec, ConfigOrigin::File(path.clone()))),
        LogSource::Builtin(config) => validate_config(config)
            .map_err(|errors| SetupError::Config(ConfigError::Validation(errors)))
            .and_then(|spec| install(&spec, ConfigOrigin::BuiltinDefault)),
    };

    match attempt {
        Ok(context) => {
            match context.origin() {
                ConfigOrigin::File(path) => {
                    context.logger().debug(format_args!("Logging configured from {}", path.display()))
                }
                _ => context.logger().debug("Logging configured with default settings"),
            }
            context
        }
        Err(err) => fallback(&err),
    }
}

fn fallback(err: &SetupError) -> LoggingContext {
    let installed = validate_config(&LoggingConfig::fallback())
        .map_err(|errors| SetupError::Config(ConfigError::Validation(errors)))
        .and_then(|spec| install(&spec, ConfigOrigin::Fallback));

    match installed {
        Ok(context) => {
            tracing::dispatcher::with_default(context.dispatch(), || {
                tracing::error!(target: "root", "Error configuring logging: {}", err)
            });
            context
        }
        Err(fallback_err) => {
            eprintln!("Error configuring logging: {} (fallback failed: {})", err, fallback_err);
            LoggingContext {
                dispatch: Dispatch::none(),
                root_handlers: Vec::new(),
                job_handlers: Vec::new(),
                other_handlers: Vec::new(),
                origin: ConfigOrigin::Fallback,
                closed: false,
            }
        }
    }
}

/// Build every handler of `spec` and assemble the dispatcher.
fn install(spec: &LoggingSpec, origin: ConfigOrigin) -> Result<LoggingContext, SetupError> {
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(spec.handlers.len());
    let mut handles = Vec::with_capacity(spec.handlers.len());

    for (name, handler) in &spec.handlers {
        let (layer, handle) = build_handler(name, handler, handler_filter(spec, name, handler.level))?;
        layers.push(layer);
        handles.push((name.clone(), handle));
    }

    let pick = |names: &[String]| -> Vec<SinkHandle> {
        names
            .iter()
            .filter_map(|n| handles.iter().find(|(name, _)| name == n).map(|(_, h)| h.clone()))
            .collect()
    };
    let root_handlers = pick(&spec.root.handlers);
    let job_handlers = spec
        .loggers
        .get(LOGGER_NAME)
        .map(|logger| pick(&logger.handlers))
        .unwrap_or_default();
    let other_handlers = handles
        .iter()
        .filter(|(name, _)| {
            !spec.root.handlers.contains(name)
                && !spec
                    .loggers
                    .get(LOGGER_NAME)
                    .is_some_and(|logger| logger.handlers.contains(name))
        })
        .map(|(_, h)| h.clone())
        .collect();

    let subscriber = Registry::default().with(layers);

    Ok(LoggingContext {
        dispatch: Dispatch::new(subscriber),
        root_handlers,
        job_handlers,
        other_handlers,
        origin,
        closed: false,
    })
}

fn build_handler(
    name: &str,
    handler: &HandlerSpec,
    filter: Targets,
) -> Result<(BoxedLayer, SinkHandle), SetupError> {
    let handle = match &handler.kind {
        HandlerKind::Console(stream) => SinkHandle::console(name, *stream),
        HandlerKind::File { path, append } => {
            SinkHandle::file(name, path, *append).map_err(|source| SetupError::Handler {
                handler: name.to_string(),
                source,
            })?
        }
        HandlerKind::GelfTcp(target) => SinkHandle::tcp(name, &target.host, target.port),
    };

    let layer: BoxedLayer = match &handler.kind {
        HandlerKind::GelfTcp(target) => GelfLayer::new(handle.clone(), target)
            .with_filter(filter)
            .boxed(),
        HandlerKind::Console(_) | HandlerKind::File { .. } => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(handler.formatter.clone())
            .with_writer(handle.clone())
            .with_filter(filter)
            .boxed(),
    };

    Ok((layer, handle))
}

/// Per-handler target filter.
///
/// A record reaches a handler when its logger lists the handler, or when the
/// logger propagates and the root lists it. The logger's threshold and the
/// handler's threshold both apply.
pub fn handler_filter(spec: &LoggingSpec, handler: &str, handler_level: LevelFilter) -> Targets {
    let root_has = spec.root.handlers.iter().any(|h| h == handler);
    let root_level = spec.root.level.unwrap_or(LevelFilter::WARN);

    let default = if root_has {
        root_level.min(handler_level)
    } else {
        LevelFilter::OFF
    };
    let mut targets = Targets::new().with_default(default);

    for (name, logger) in &spec.loggers {
        let direct = logger.handlers.iter().any(|h| h == handler);
        let level = if direct || (logger.propagate && root_has) {
            spec.effective_level(logger).min(handler_level)
        } else {
            LevelFilter::OFF
        };
        targets = targets.with_target(name.clone(), level);
    }

    targets
}
