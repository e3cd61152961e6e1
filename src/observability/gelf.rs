//! GELF 1.1 over TCP.
//!
//! Each record becomes one JSON object terminated by a NUL byte. Record
//! extras are sent as `_<key>` additional fields when enabled; the handler's
//! static `_*` options are stamped on every message.

use serde_json::{Map, Value};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::validation::GelfTarget;
use crate::observability::record::LogRecord;
use crate::observability::sink::SinkHandle;

/// Layer shipping records to a GELF TCP input.
pub struct GelfLayer {
    sink: SinkHandle,
    source_host: String,
    include_extra_fields: bool,
    static_fields: Map<String, Value>,
}

impl GelfLayer {
    pub fn new(sink: SinkHandle, target: &GelfTarget) -> Self {
        Self {
            sink,
            source_host: local_hostname(),
            include_extra_fields: target.include_extra_fields,
            static_fields: target
                .static_fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Build the GELF document for a record.
    pub fn payload(&self, record: &LogRecord) -> Value {
        let mut doc = Map::new();
        doc.insert("version".into(), "1.1".into());
        doc.insert("host".into(), self.source_host.clone().into());
        doc.insert("short_message".into(), record.message.clone().into());
        doc.insert("timestamp".into(), record.created().into());
        doc.insert("level".into(), record.syslog_level().into());
        doc.insert("_logger".into(), record.name.clone().into());
        if let Some(file) = &record.file {
            doc.insert("_file".into(), file.clone().into());
        }
        if let Some(line) = record.line {
            doc.insert("_line".into(), line.into());
        }
        doc.insert("_module".into(), record.module().into());

        if self.include_extra_fields {
            for (key, value) in &record.fields {
                // `_id` is reserved by the GELF spec.
                if key != "id" {
                    doc.insert(format!("_{}", key), value.clone().into());
                }
            }
        }

        for (key, value) in &self.static_fields {
            doc.insert(key.clone(), value.clone());
        }

        Value::Object(doc)
    }
}

impl<S: Subscriber> Layer<S> for GelfLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let record = LogRecord::from_event(event);
        if let Ok(mut frame) = serde_json::to_vec(&self.payload(&record)) {
            frame.push(0);
            self.sink.sink().write_record(&frame);
        }
    }
}

fn local_hostname() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}
