//! Logging configuration schema definitions.
//!
//! This module defines the raw structure of the keyed logging document.
//! All types derive Serde traits for deserialization from YAML; semantic
//! checks live in `validation.rs`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Line pattern shared by the built-in default and the fallback configuration.
pub const DEFAULT_FORMAT: &str =
    "%(asctime)s %(levelname)-8s [%(filename)s %(lineno)d] : %(message)s";

/// Handler class writing to a console stream.
pub const STREAM_HANDLER: &str = "logging.StreamHandler";
/// Handler class appending to a file.
pub const FILE_HANDLER: &str = "logging.FileHandler";
/// Handler class shipping GELF messages over TCP.
pub const GELF_TCP_HANDLER: &str = "pygelf.GelfTcpHandler";

/// Stream target for stdout.
pub const STDOUT_STREAM: &str = "ext://sys.stdout";
/// Stream target for stderr.
pub const STDERR_STREAM: &str = "ext://sys.stderr";

/// Default port of the Graylog GELF TCP input.
pub const DEFAULT_GELF_PORT: u16 = 4545;

/// Graylog input the built-in configuration ships records to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GelfEndpoint {
    pub host: String,
    pub port: u16,
}

/// Root of the logging document.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Schema version. Only `1` is accepted.
    pub version: u32,

    /// Accepted for compatibility, has no effect.
    pub disable_existing_loggers: Option<bool>,

    /// Named line formats.
    pub formatters: BTreeMap<String, FormatterConfig>,

    /// Named output handlers.
    pub handlers: BTreeMap<String, HandlerConfig>,

    /// Named loggers. The name `root` addresses the root logger.
    pub loggers: BTreeMap<String, LoggerConfig>,

    /// Root logger; takes precedence over `loggers.root`.
    pub root: Option<LoggerConfig>,
}

/// Formatter definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FormatterConfig {
    /// `%(key)s` style line pattern.
    #[serde(default = "default_format")]
    pub format: String,

    /// strftime pattern for `asctime`.
    #[serde(default)]
    pub datefmt: Option<String>,
}

fn default_format() -> String {
    "%(message)s".to_string()
}

/// Handler definition. Class-specific options stay untyped until validation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HandlerConfig {
    /// Handler class identifier, e.g. `logging.StreamHandler`.
    pub class: String,

    /// Minimum level for this handler.
    #[serde(default)]
    pub level: Option<LevelName>,

    /// Formatter name.
    #[serde(default)]
    pub formatter: Option<String>,

    /// Remaining class-specific keys.
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_yaml::Value>,
}

/// Logger definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Option<LevelName>,

    #[serde(default)]
    pub handlers: Vec<String>,

    #[serde(default = "default_propagate")]
    pub propagate: bool,
}

fn default_propagate() -> bool {
    true
}

/// Level as written in the document: a name (`INFO`) or a number (`20`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LevelName {
    Name(String),
    Number(i64),
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelName::Name(name) => f.write_str(name),
            LevelName::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for LevelName {
    fn from(name: &str) -> Self {
        LevelName::Name(name.to_string())
    }
}

impl<'de> Deserialize<'de> for LevelName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LevelVisitor;

        impl<'de> Visitor<'de> for LevelVisitor {
            type Value = LevelName;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a level name or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LevelName, E> {
                Ok(LevelName::Name(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LevelName, E> {
                Ok(LevelName::Number(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LevelName, E> {
                i64::try_from(v)
                    .map(LevelName::Number)
                    .map_err(|_| E::custom(format!("level {} out of range", v)))
            }
        }

        deserializer.deserialize_any(LevelVisitor)
    }
}

impl HandlerConfig {
    fn console(stream: &str, level: &str, formatter: &str) -> Self {
        let mut options = BTreeMap::new();
        options.insert("stream".to_string(), serde_yaml::Value::from(stream));
        Self {
            class: STREAM_HANDLER.to_string(),
            level: Some(level.into()),
            formatter: Some(formatter.to_string()),
            options,
        }
    }

    fn gelf(endpoint: &GelfEndpoint, level: &str) -> Self {
        let mut options = BTreeMap::new();
        options.insert("host".to_string(), serde_yaml::Value::from(endpoint.host.as_str()));
        options.insert("port".to_string(), serde_yaml::Value::from(endpoint.port));
        options.insert("include_extra_fields".to_string(), serde_yaml::Value::from(true));
        options.insert("_appName".to_string(), serde_yaml::Value::from(crate::observability::LOGGER_NAME));
        options.insert("_appType".to_string(), serde_yaml::Value::from("batch"));
        options.insert("_facility".to_string(), serde_yaml::Value::from("Hill"));
        Self {
            class: GELF_TCP_HANDLER.to_string(),
            level: Some(level.into()),
            formatter: None,
            options,
        }
    }
}

impl LoggingConfig {
    /// Built-in configuration used when no document is found on disk.
    ///
    /// With a `gelf` endpoint, the job and root loggers also ship to Graylog.
    pub fn builtin(gelf: Option<&GelfEndpoint>) -> Self {
        let mut config = Self {
            version: 1,
            disable_existing_loggers: Some(false),
            ..Self::default()
        };
        config.formatters.insert(
            "simple".to_string(),
            FormatterConfig { format: DEFAULT_FORMAT.to_string(), datefmt: None },
        );
        config
            .handlers
            .insert("console".to_string(), HandlerConfig::console(STDOUT_STREAM, "INFO", "simple"));

        let mut handlers = vec!["console".to_string()];
        if let Some(endpoint) = gelf {
            config.handlers.insert("gelf".to_string(), HandlerConfig::gelf(endpoint, "INFO"));
            handlers.push("gelf".to_string());
        }

        config.loggers.insert(
            crate::observability::LOGGER_NAME.to_string(),
            LoggerConfig {
                level: Some("INFO".into()),
                handlers: handlers.clone(),
                propagate: false,
            },
        );
        config.loggers.insert(
            "root".to_string(),
            LoggerConfig {
                level: Some("ERROR".into()),
                handlers,
                propagate: true,
            },
        );
        config
    }

    /// Minimal console-only configuration installed when setup fails.
    pub fn fallback() -> Self {
        let mut config = Self { version: 1, ..Self::default() };
        config.formatters.insert(
            "fallback".to_string(),
            FormatterConfig { format: DEFAULT_FORMAT.to_string(), datefmt: None },
        );
        config
            .handlers
            .insert("console".to_string(), HandlerConfig::console(STDOUT_STREAM, "INFO", "fallback"));
        config.root = Some(LoggerConfig {
            level: Some("INFO".into()),
            handlers: vec!["console".to_string()],
            propagate: true,
        });
        config
    }
}
