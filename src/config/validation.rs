//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (loggers reference existing handlers,
//!   handlers reference existing formatters)
//! - Map handler classes onto the enumerated set we know how to build
//! - Parse levels and line patterns up front
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: LoggingConfig → Result<LoggingSpec, Vec<ValidationError>>
//! - Unknown handler classes are rejected rather than guessed at

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::config::schema::{
    FormatterConfig, HandlerConfig, LevelName, LoggerConfig, LoggingConfig, FILE_HANDLER,
    GELF_TCP_HANDLER, STDERR_STREAM, STDOUT_STREAM, STREAM_HANDLER,
};
use crate::observability::format::{LineFormatter, LinePattern};

/// A single semantic problem in a logging document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported version {0}, expected 1")]
    UnsupportedVersion(u32),

    #[error("handler '{handler}': unknown class '{class}'")]
    UnknownHandlerClass { handler: String, class: String },

    #[error("handler '{handler}': missing option '{option}'")]
    MissingOption { handler: String, option: String },

    #[error("handler '{handler}': invalid option '{option}': {reason}")]
    InvalidOption { handler: String, option: String, reason: String },

    #[error("handler '{handler}': unknown formatter '{formatter}'")]
    UnknownFormatter { handler: String, formatter: String },

    #[error("logger '{logger}': unknown handler '{handler}'")]
    UnknownHandler { logger: String, handler: String },

    #[error("{owner}: invalid level '{level}'")]
    InvalidLevel { owner: String, level: String },

    #[error("formatter '{formatter}': {reason}")]
    InvalidFormatter { formatter: String, reason: String },
}

/// Console stream a stream handler writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

/// Remote GELF endpoint plus the fields stamped onto every message.
#[derive(Debug, Clone, PartialEq)]
pub struct GelfTarget {
    pub host: String,
    pub port: u16,
    pub include_extra_fields: bool,
    pub static_fields: BTreeMap<String, serde_json::Value>,
}

/// The handler classes we know how to build.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerKind {
    Console(ConsoleStream),
    File { path: PathBuf, append: bool },
    GelfTcp(GelfTarget),
}

/// Validated handler.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    pub kind: HandlerKind,
    pub level: LevelFilter,
    pub formatter: LineFormatter,
}

/// Validated logger. `level: None` inherits from the root logger.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerSpec {
    pub level: Option<LevelFilter>,
    pub handlers: Vec<String>,
    pub propagate: bool,
}

/// Validated, immutable logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSpec {
    pub handlers: BTreeMap<String, HandlerSpec>,
    pub root: LoggerSpec,
    pub loggers: BTreeMap<String, LoggerSpec>,
}

impl LoggingSpec {
    /// Effective threshold of a named logger.
    pub fn effective_level(&self, logger: &LoggerSpec) -> LevelFilter {
        logger
            .level
            .or(self.root.level)
            .unwrap_or(LevelFilter::WARN)
    }
}

/// A recognized level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLevel {
    /// `NOTSET` or `0`: defer to the parent logger.
    NotSet,
    Level(LevelFilter),
}

impl ParsedLevel {
    /// The explicit threshold, if any.
    pub fn filter(self) -> Option<LevelFilter> {
        match self {
            ParsedLevel::NotSet => None,
            ParsedLevel::Level(level) => Some(level),
        }
    }
}

/// Map a level name or number onto a tracing filter. `None` if unrecognized.
pub fn parse_level(level: &LevelName) -> Option<ParsedLevel> {
    let parsed = match level {
        LevelName::Name(name) => match name.to_ascii_uppercase().as_str() {
            "CRITICAL" | "FATAL" | "ERROR" => ParsedLevel::Level(LevelFilter::ERROR),
            "WARNING" | "WARN" => ParsedLevel::Level(LevelFilter::WARN),
            "INFO" => ParsedLevel::Level(LevelFilter::INFO),
            "DEBUG" => ParsedLevel::Level(LevelFilter::DEBUG),
            "NOTSET" => ParsedLevel::NotSet,
            _ => return None,
        },
        LevelName::Number(n) => match *n {
            n if n < 0 => return None,
            n if n >= 40 => ParsedLevel::Level(LevelFilter::ERROR),
            n if n >= 30 => ParsedLevel::Level(LevelFilter::WARN),
            n if n >= 20 => ParsedLevel::Level(LevelFilter::INFO),
            n if n >= 10 => ParsedLevel::Level(LevelFilter::DEBUG),
            n if n > 0 => ParsedLevel::Level(LevelFilter::TRACE),
            _ => ParsedLevel::NotSet,
        },
    };
    Some(parsed)
}

/// Validate a parsed logging document.
pub fn validate_config(config: &LoggingConfig) -> Result<LoggingSpec, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.version != 1 {
        errors.push(ValidationError::UnsupportedVersion(config.version));
    }

    let formatters: BTreeMap<&str, LineFormatter> = config
        .formatters
        .iter()
        .filter_map(|(name, formatter)| match build_formatter(formatter) {
            Ok(built) => Some((name.as_str(), built)),
            Err(reason) => {
                errors.push(ValidationError::InvalidFormatter { formatter: name.clone(), reason });
                None
            }
        })
        .collect();

    let mut handlers = BTreeMap::new();
    for (name, handler) in &config.handlers {
        if let Some(spec) = validate_handler(name, handler, &config.formatters, &formatters, &mut errors) {
            handlers.insert(name.clone(), spec);
        }
    }

    let root_config = config
        .root
        .as_ref()
        .or_else(|| config.loggers.get("root"));
    let root = match root_config {
        Some(root_config) => {
            let root = validate_logger("root", root_config, config, &mut errors);
            let level = match (&root_config.level, root.level) {
                (None, _) => LevelFilter::WARN,
                // NOTSET on the root passes everything.
                (Some(_), None) => LevelFilter::TRACE,
                (Some(_), Some(level)) => level,
            };
            LoggerSpec { level: Some(level), ..root }
        }
        None => LoggerSpec { level: Some(LevelFilter::WARN), handlers: Vec::new(), propagate: true },
    };

    let loggers = config
        .loggers
        .iter()
        .filter(|(name, _)| name.as_str() != "root")
        .map(|(name, logger)| (name.clone(), validate_logger(name, logger, config, &mut errors)))
        .collect();

    if errors.is_empty() {
        Ok(LoggingSpec { handlers, root, loggers })
    } else {
        Err(errors)
    }
}

fn build_formatter(formatter: &FormatterConfig) -> Result<LineFormatter, String> {
    let pattern = LinePattern::parse(&formatter.format).map_err(|e| e.to_string())?;
    LineFormatter::new(pattern, formatter.datefmt.clone()).map_err(|e| e.to_string())
}

fn validate_handler(
    name: &str,
    handler: &HandlerConfig,
    declared_formatters: &BTreeMap<String, FormatterConfig>,
    formatters: &BTreeMap<&str, LineFormatter>,
    errors: &mut Vec<ValidationError>,
) -> Option<HandlerSpec> {
    let level = match &handler.level {
        None => LevelFilter::TRACE,
        Some(level) => match parse_level(level) {
            Some(ParsedLevel::Level(filter)) => filter,
            Some(ParsedLevel::NotSet) => LevelFilter::TRACE,
            None => {
                errors.push(ValidationError::InvalidLevel {
                    owner: format!("handler '{}'", name),
                    level: level.to_string(),
                });
                return None;
            }
        },
    };

    let formatter = match &handler.formatter {
        None => LineFormatter::default(),
        Some(formatter) => match formatters.get(formatter.as_str()) {
            Some(built) => built.clone(),
            None => {
                // Broken formatters were already reported on their own.
                if !declared_formatters.contains_key(formatter) {
                    errors.push(ValidationError::UnknownFormatter {
                        handler: name.to_string(),
                        formatter: formatter.clone(),
                    });
                }
                return None;
            }
        },
    };

    let kind = match handler.class.as_str() {
        STREAM_HANDLER => console_kind(name, handler, errors)?,
        FILE_HANDLER => file_kind(name, handler, errors)?,
        GELF_TCP_HANDLER => gelf_kind(name, handler, errors)?,
        other => {
            errors.push(ValidationError::UnknownHandlerClass {
                handler: name.to_string(),
                class: other.to_string(),
            });
            return None;
        }
    };

    Some(HandlerSpec { kind, level, formatter })
}

fn string_option<'a>(
    name: &str,
    handler: &'a HandlerConfig,
    option: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Option<&'a str>> {
    match handler.options.get(option) {
        None => Some(None),
        Some(value) => match value.as_str() {
            Some(s) => Some(Some(s)),
            None => {
                errors.push(ValidationError::InvalidOption {
                    handler: name.to_string(),
                    option: option.to_string(),
                    reason: "expected a string".to_string(),
                });
                None
            }
        },
    }
}

fn console_kind(
    name: &str,
    handler: &HandlerConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<HandlerKind> {
    let stream = match string_option(name, handler, "stream", errors)? {
        None | Some(STDERR_STREAM) => ConsoleStream::Stderr,
        Some(STDOUT_STREAM) => ConsoleStream::Stdout,
        Some(other) => {
            errors.push(ValidationError::InvalidOption {
                handler: name.to_string(),
                option: "stream".to_string(),
                reason: format!("unsupported stream '{}'", other),
            });
            return None;
        }
    };
    Some(HandlerKind::Console(stream))
}

fn file_kind(
    name: &str,
    handler: &HandlerConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<HandlerKind> {
    let filename = string_option(name, handler, "filename", errors)?;
    let mode = string_option(name, handler, "mode", errors)?;

    let Some(filename) = filename else {
        errors.push(ValidationError::MissingOption {
            handler: name.to_string(),
            option: "filename".to_string(),
        });
        return None;
    };

    let append = match mode {
        None | Some("a") => true,
        Some("w") => false,
        Some(other) => {
            errors.push(ValidationError::InvalidOption {
                handler: name.to_string(),
                option: "mode".to_string(),
                reason: format!("unsupported mode '{}'", other),
            });
            return None;
        }
    };

    Some(HandlerKind::File { path: PathBuf::from(filename), append })
}

fn gelf_kind(
    name: &str,
    handler: &HandlerConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<HandlerKind> {
    let invalid = |option: &str, reason: &str| ValidationError::InvalidOption {
        handler: name.to_string(),
        option: option.to_string(),
        reason: reason.to_string(),
    };

    let host = string_option(name, handler, "host", errors)?;
    let Some(host) = host else {
        errors.push(ValidationError::MissingOption {
            handler: name.to_string(),
            option: "host".to_string(),
        });
        return None;
    };

    let port = match handler.options.get("port") {
        None => {
            errors.push(ValidationError::MissingOption {
                handler: name.to_string(),
                option: "port".to_string(),
            });
            return None;
        }
        Some(value) => match value.as_u64().and_then(|p| u16::try_from(p).ok()) {
            Some(port) if port > 0 => port,
            _ => {
                errors.push(invalid("port", "expected a port number between 1 and 65535"));
                return None;
            }
        },
    };

    let include_extra_fields = match handler.options.get("include_extra_fields") {
        None => false,
        Some(value) => match value.as_bool() {
            Some(flag) => flag,
            None => {
                errors.push(invalid("include_extra_fields", "expected a boolean"));
                return None;
            }
        },
    };

    let mut static_fields = BTreeMap::new();
    for (key, value) in handler.options.iter().filter(|(k, _)| k.starts_with('_')) {
        match serde_json::to_value(value) {
            Ok(json) => {
                static_fields.insert(key.clone(), json);
            }
            Err(e) => {
                errors.push(invalid(key, &e.to_string()));
                return None;
            }
        }
    }

    Some(HandlerKind::GelfTcp(GelfTarget {
        host: host.to_string(),
        port,
        include_extra_fields,
        static_fields,
    }))
}

fn validate_logger(
    name: &str,
    logger: &LoggerConfig,
    config: &LoggingConfig,
    errors: &mut Vec<ValidationError>,
) -> LoggerSpec {
    let level = match &logger.level {
        None => None,
        Some(level) => match parse_level(level) {
            Some(parsed) => parsed.filter(),
            None => {
                errors.push(ValidationError::InvalidLevel {
                    owner: format!("logger '{}'", name),
                    level: level.to_string(),
                });
                None
            }
        },
    };

    for handler in &logger.handlers {
        if !config.handlers.contains_key(handler) {
            errors.push(ValidationError::UnknownHandler {
                logger: name.to_string(),
                handler: handler.clone(),
            });
        }
    }

    LoggerSpec {
        level,
        handlers: logger.handlers.clone(),
        propagate: logger.propagate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{GelfEndpoint, DEFAULT_GELF_PORT};

    fn parse(yaml: &str) -> LoggingConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_builtin_and_fallback_are_valid() {
        assert!(validate_config(&LoggingConfig::builtin(None)).is_ok());
        assert!(validate_config(&LoggingConfig::fallback()).is_ok());
    }

    #[test]
    fn test_builtin_levels() {
        let spec = validate_config(&LoggingConfig::builtin(None)).unwrap();
        assert_eq!(spec.root.level, Some(LevelFilter::ERROR));
        let test = &spec.loggers["test"];
        assert_eq!(spec.effective_level(test), LevelFilter::INFO);
        assert!(!test.propagate);
        assert!(!spec.loggers.contains_key("root"));
    }

    #[test]
    fn test_builtin_gelf_handler_validates() {
        let endpoint = GelfEndpoint { host: "graylog.internal".to_string(), port: DEFAULT_GELF_PORT };
        let spec = validate_config(&LoggingConfig::builtin(Some(&endpoint))).unwrap();

        let HandlerKind::GelfTcp(target) = &spec.handlers["gelf"].kind else {
            panic!("expected a GELF handler");
        };
        assert_eq!((target.host.as_str(), target.port), ("graylog.internal", 4545));
        assert!(target.include_extra_fields);
        assert_eq!(target.static_fields["_facility"], serde_json::json!("Hill"));
        assert_eq!(spec.root.handlers, vec!["console", "gelf"]);
    }

    #[test]
    fn test_rejects_wrong_version() {
        let errors = validate_config(&parse("version: 2\n")).unwrap_err();
        assert_eq!(errors, vec![ValidationError::UnsupportedVersion(2)]);
    }

    #[test]
    fn test_collects_every_error() {
        let config = parse(
            r#"
version: 1
handlers:
  weird:
    class: logging.handlers.SysLogHandler
  console:
    class: logging.StreamHandler
    formatter: missing
    level: LOUD
loggers:
  test:
    handlers: [nowhere]
    level: 99x
"#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownHandlerClass { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidLevel { owner, .. } if owner.contains("console"))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownHandler { handler, .. } if handler == "nowhere")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidLevel { owner, .. } if owner.contains("test"))));
    }

    #[test]
    fn test_unknown_formatter_reference() {
        let config = parse(
            "version: 1\nhandlers:\n  console:\n    class: logging.StreamHandler\n    formatter: nope\n",
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownFormatter {
                handler: "console".into(),
                formatter: "nope".into()
            }]
        );
    }

    #[test]
    fn test_invalid_pattern_reported_once() {
        let config = parse(
            r#"
version: 1
formatters:
  broken:
    format: "%(message"
handlers:
  console:
    class: logging.StreamHandler
    formatter: broken
"#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::InvalidFormatter { .. }));
    }

    #[test]
    fn test_stream_defaults_to_stderr() {
        let spec = validate_config(&parse(
            "version: 1\nhandlers:\n  console:\n    class: logging.StreamHandler\n",
        ))
        .unwrap();
        assert_eq!(spec.handlers["console"].kind, HandlerKind::Console(ConsoleStream::Stderr));
        assert_eq!(spec.handlers["console"].level, LevelFilter::TRACE);
    }

    #[test]
    fn test_file_handler_options() {
        let spec = validate_config(&parse(
            "version: 1\nhandlers:\n  file:\n    class: logging.FileHandler\n    filename: job.log\n    mode: w\n",
        ))
        .unwrap();
        assert_eq!(
            spec.handlers["file"].kind,
            HandlerKind::File { path: PathBuf::from("job.log"), append: false }
        );

        let errors = validate_config(&parse(
            "version: 1\nhandlers:\n  file:\n    class: logging.FileHandler\n",
        ))
        .unwrap_err();
        assert!(matches!(errors[0], ValidationError::MissingOption { ref option, .. } if option == "filename"));
    }

    #[test]
    fn test_gelf_handler_options() {
        let spec = validate_config(&parse(
            r#"
version: 1
handlers:
  gelf:
    class: pygelf.GelfTcpHandler
    host: logs.example.org
    port: 4545
    include_extra_fields: true
    _appName: test
    _appType: batch
"#,
        ))
        .unwrap();
        let HandlerKind::GelfTcp(target) = &spec.handlers["gelf"].kind else {
            panic!("expected gelf handler");
        };
        assert_eq!(target.host, "logs.example.org");
        assert_eq!(target.port, 4545);
        assert!(target.include_extra_fields);
        assert_eq!(target.static_fields["_appName"], serde_json::json!("test"));
        assert_eq!(target.static_fields.len(), 2);
    }

    #[test]
    fn test_gelf_rejects_bad_port() {
        let errors = validate_config(&parse(
            "version: 1\nhandlers:\n  gelf:\n    class: pygelf.GelfTcpHandler\n    host: h\n    port: 70000\n",
        ))
        .unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidOption { ref option, .. } if option == "port"));
    }

    #[test]
    fn test_top_level_root_wins() {
        let spec = validate_config(&parse(
            "version: 1\nroot:\n  level: DEBUG\nloggers:\n  root:\n    level: ERROR\n",
        ))
        .unwrap();
        assert_eq!(spec.root.level, Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_missing_root_defaults_to_warning() {
        let spec = validate_config(&parse("version: 1\nloggers:\n  test: {}\n")).unwrap();
        assert_eq!(spec.root.level, Some(LevelFilter::WARN));
        assert_eq!(spec.effective_level(&spec.loggers["test"]), LevelFilter::WARN);
    }

    #[test]
    fn test_parse_level_names_and_numbers() {
        assert_eq!(parse_level(&"warning".into()), Some(ParsedLevel::Level(LevelFilter::WARN)));
        assert_eq!(parse_level(&"CRITICAL".into()), Some(ParsedLevel::Level(LevelFilter::ERROR)));
        assert_eq!(parse_level(&"NOTSET".into()), Some(ParsedLevel::NotSet));
        assert_eq!(parse_level(&LevelName::Number(20)), Some(ParsedLevel::Level(LevelFilter::INFO)));
        assert_eq!(parse_level(&LevelName::Number(0)), Some(ParsedLevel::NotSet));
        assert_eq!(ParsedLevel::NotSet.filter(), None);
        assert_eq!(parse_level(&LevelName::Number(-5)), None);
        assert_eq!(parse_level(&"LOUD".into()), None);
    }
}
