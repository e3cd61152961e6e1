//! Configuration service settings, read from the environment.

use std::time::Duration;

/// Base URL of the configuration service.
pub const ATHENA_URL_ENV: &str = "ATHENA_URL";
/// Credential presented to the configuration service.
pub const ATHENA_SECRET_ENV: &str = "ATHENA_SECRET";
/// Optional label (branch) of the configuration bundle.
pub const ATHENA_LABEL_ENV: &str = "ATHENA_LABEL";
/// Request timeout in seconds.
pub const ATHENA_TIMEOUT_ENV: &str = "ATHENA_TIMEOUT_SECS";

/// Connection settings for the configuration service.
#[derive(Clone, PartialEq, Eq)]
pub struct AthenaSettings {
    /// Service base URL (e.g., "http://localhost:8888").
    pub url: String,

    /// Bearer credential. `None` means properties cannot be fetched.
    pub secret: Option<String>,

    /// Optional bundle label appended to the request path.
    pub label: Option<String>,

    /// Whole-request timeout.
    pub timeout_secs: u64,
}

impl Default for AthenaSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8888".to_string(),
            secret: None,
            label: None,
            timeout_secs: 30,
        }
    }
}

// Keeps the secret out of debug output.
impl std::fmt::Debug for AthenaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AthenaSettings")
            .field("url", &self.url)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("label", &self.label)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AthenaSettings {
    /// Settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings read through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            url: get(ATHENA_URL_ENV).unwrap_or(defaults.url),
            secret: get(ATHENA_SECRET_ENV),
            label: get(ATHENA_LABEL_ENV),
            timeout_secs: get(ATHENA_TIMEOUT_ENV)
                .and_then(|v| v.trim().parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = AthenaSettings::from_lookup(lookup(&[]));
        assert_eq!(settings, AthenaSettings::default());
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = AthenaSettings::from_lookup(lookup(&[
            (ATHENA_URL_ENV, "https://config.example.org"),
            (ATHENA_SECRET_ENV, "s3cret"),
            (ATHENA_LABEL_ENV, "release"),
            (ATHENA_TIMEOUT_ENV, "5"),
        ]));
        assert_eq!(settings.url, "https://config.example.org");
        assert_eq!(settings.secret.as_deref(), Some("s3cret"));
        assert_eq!(settings.label.as_deref(), Some("release"));
        assert_eq!(settings.timeout_secs, 5);
    }

    #[test]
    fn test_empty_secret_is_unset() {
        let settings = AthenaSettings::from_lookup(lookup(&[(ATHENA_SECRET_ENV, "  ")]));
        assert!(settings.secret.is_none());
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let settings = AthenaSettings::from_lookup(lookup(&[(ATHENA_TIMEOUT_ENV, "soon")]));
        assert_eq!(settings.timeout_secs, 30);
        let settings = AthenaSettings::from_lookup(lookup(&[(ATHENA_TIMEOUT_ENV, "0")]));
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn test_debug_hides_secret() {
        let settings = AthenaSettings { secret: Some("s3cret".into()), ..Default::default() };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("***"));
    }
}
