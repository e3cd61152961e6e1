//! Configuration service types and error definitions.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Flattened key-value properties for one profile.
pub type PropertySet = BTreeMap<String, String>;

/// Errors that can occur while talking to the configuration service.
#[derive(Debug, Error)]
pub enum AthenaError {
    /// The configured base URL cannot be used.
    #[error("invalid configuration service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Request did not complete in time.
    #[error("configuration service timed out after {0} seconds")]
    Timeout(u64),

    /// Transport-level failure (connect, TLS, body read).
    #[error("configuration service request failed")]
    Http(#[source] reqwest::Error),

    /// Non-success status other than the "unavailable" family.
    #[error("configuration service returned HTTP {0}")]
    Status(u16),

    /// Body was not a config environment document.
    #[error("malformed configuration document")]
    Decode(#[source] serde_json::Error),
}

/// Result type for configuration service operations.
pub type AthenaResult<T> = Result<T, AthenaError>;

/// Config-server environment document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEnvironment {
    pub name: String,

    #[serde(default)]
    pub profiles: Vec<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub property_sources: Vec<PropertySourceDoc>,
}

/// One named layer of properties.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertySourceDoc {
    pub name: String,

    #[serde(default)]
    pub source: serde_json::Map<String, serde_json::Value>,
}

impl ConfigEnvironment {
    /// Merge all sources; earlier sources take precedence.
    pub fn flatten(&self) -> PropertySet {
        let mut properties = PropertySet::new();
        for doc in self.property_sources.iter().rev() {
            for (key, value) in &doc.source {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                properties.insert(key.clone(), rendered);
            }
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_precedence_and_rendering() {
        let doc: ConfigEnvironment = serde_json::from_str(
            r#"{
                "name": "test",
                "profiles": ["acad", "dev"],
                "label": null,
                "propertySources": [
                    {"name": "test-acad,dev.yml", "source": {"property.name": "override", "retries": 3}},
                    {"name": "test.yml", "source": {"property.name": "base", "enabled": true}}
                ]
            }"#,
        )
        .unwrap();

        let properties = doc.flatten();
        assert_eq!(properties["property.name"], "override");
        assert_eq!(properties["retries"], "3");
        assert_eq!(properties["enabled"], "true");
        assert_eq!(doc.profiles, vec!["acad", "dev"]);
    }

    #[test]
    fn test_flatten_without_sources_is_empty() {
        let doc: ConfigEnvironment = serde_json::from_str(r#"{"name": "test"}"#).unwrap();
        assert!(doc.flatten().is_empty());
    }
}
