//! Log records extracted from tracing events.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::field::{Field, Visit};
use tracing::{Event, Level};

/// Field carrying the source file of the logging call site.
pub const CALLER_FILE: &str = "caller_file";
/// Field carrying the source line of the logging call site.
pub const CALLER_LINE: &str = "caller_line";

/// Everything a handler needs to render one event.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    /// Logger name (the tracing target).
    pub name: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Extra key-value fields, in emission order.
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Capture an event, honouring `caller_file`/`caller_line` overrides.
    pub fn from_event(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        Self {
            timestamp: Local::now(),
            level: *metadata.level(),
            name: metadata.target().to_string(),
            message: collector.message.unwrap_or_default(),
            file: collector.file.or_else(|| metadata.file().map(str::to_string)),
            line: collector.line.or_else(|| metadata.line()),
            fields: collector.fields,
        }
    }

    /// Logging-style level name.
    pub fn levelname(&self) -> &'static str {
        match self.level {
            Level::ERROR => "ERROR",
            Level::WARN => "WARNING",
            Level::INFO => "INFO",
            Level::DEBUG => "DEBUG",
            _ => "TRACE",
        }
    }

    /// Logging-style numeric level.
    pub fn levelno(&self) -> i64 {
        match self.level {
            Level::ERROR => 40,
            Level::WARN => 30,
            Level::INFO => 20,
            Level::DEBUG => 10,
            _ => 5,
        }
    }

    /// Syslog severity, as used by GELF.
    pub fn syslog_level(&self) -> u8 {
        match self.level {
            Level::ERROR => 3,
            Level::WARN => 4,
            Level::INFO => 6,
            _ => 7,
        }
    }

    /// Seconds since the epoch, with sub-second precision.
    pub fn created(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1000.0
    }

    /// Base name of the source file.
    pub fn filename(&self) -> &str {
        self.file
            .as_deref()
            .map(|f| Path::new(f).file_name().and_then(|n| n.to_str()).unwrap_or(f))
            .unwrap_or("")
    }

    /// Source file name without its extension.
    pub fn module(&self) -> &str {
        self.file
            .as_deref()
            .and_then(|f| Path::new(f).file_stem().and_then(|n| n.to_str()))
            .unwrap_or("")
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    file: Option<String>,
    line: Option<u32>,
    fields: Vec<(String, String)>,
}

impl FieldCollector {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            CALLER_FILE => self.file = Some(value),
            CALLER_LINE => self.line = value.parse().ok(),
            name => self.fields.push((name.to_string(), value)),
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.store(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.store(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{:?}", value));
    }
}
