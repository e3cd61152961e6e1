//! Logging configuration source resolution.
//!
//! # Responsibilities
//! - Pick exactly one logging configuration source per call
//! - Fixed precedence: `LOG_CONFIG_PATH`, local file, deployment file,
//!   built-in default
//!
//! # Design Decisions
//! - The environment override is trusted as-is (no existence check); a bad
//!   path surfaces later as a load failure and triggers the fallback
//! - Candidate paths are fields so tests can point them at scratch files
//! - The built-in default ships to Graylog only when `GELF_HOST` is set, so
//!   local runs never block on an unreachable log host

use std::path::{Path, PathBuf};

use crate::config::schema::{GelfEndpoint, LoggingConfig, DEFAULT_GELF_PORT};

/// Environment variable overriding the logging configuration path.
pub const LOG_CONFIG_ENV: &str = "LOG_CONFIG_PATH";

/// Project-local configuration, used for runs outside a container.
pub const LOCAL_CONFIG_PATH: &str = "./log-config.yaml";

/// Configuration mounted into batch containers.
pub const DEPLOYMENT_CONFIG_PATH: &str = "/ext-vol/app-conf/logging/log-config.yaml";

/// Graylog host for the built-in configuration.
pub const GELF_HOST_ENV: &str = "GELF_HOST";

/// Graylog GELF TCP port for the built-in configuration.
pub const GELF_PORT_ENV: &str = "GELF_PORT";

/// Where the logging configuration comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LogSource {
    /// A YAML document on disk.
    Path(PathBuf),
    /// The in-memory default.
    Builtin(LoggingConfig),
}

/// Resolves the logging configuration source.
#[derive(Debug, Clone)]
pub struct LogConfigResolver {
    env_override: Option<String>,
    local_path: PathBuf,
    deployment_path: PathBuf,
    gelf: Option<GelfEndpoint>,
}

impl LogConfigResolver {
    /// Create a resolver with explicit candidates.
    pub fn new(
        env_override: Option<String>,
        local_path: impl Into<PathBuf>,
        deployment_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            env_override,
            local_path: local_path.into(),
            deployment_path: deployment_path.into(),
            gelf: None,
        }
    }

    /// Ship the built-in configuration's records to `endpoint` as well.
    pub fn with_gelf(mut self, endpoint: GelfEndpoint) -> Self {
        self.gelf = Some(endpoint);
        self
    }

    /// Resolver reading the override from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolver reading the override and Graylog endpoint through `lookup`,
    /// with the standard paths.
    ///
    /// An unparsable `GELF_PORT` falls back to the default port.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolver = Self::new(lookup(LOG_CONFIG_ENV), LOCAL_CONFIG_PATH, DEPLOYMENT_CONFIG_PATH);

        match lookup(GELF_HOST_ENV).filter(|host| !host.trim().is_empty()) {
            Some(host) => {
                let port = lookup(GELF_PORT_ENV)
                    .and_then(|p| p.trim().parse::<u16>().ok())
                    .filter(|p| *p > 0)
                    .unwrap_or(DEFAULT_GELF_PORT);
                resolver.with_gelf(GelfEndpoint {
                    host: host.trim().to_string(),
                    port,
                })
            }
            None => resolver,
        }
    }

    /// Pick the source. Never fails.
    pub fn resolve(&self) -> LogSource {
        if let Some(path) = self.env_override.as_deref().filter(|p| !p.is_empty()) {
            return LogSource::Path(PathBuf::from(path));
        }

        for candidate in [&self.local_path, &self.deployment_path] {
            if exists(candidate) {
                return LogSource::Path(candidate.clone());
            }
        }

        LogSource::Builtin(LoggingConfig::builtin(self.gelf.as_ref()))
    }
}

impl Default for LogConfigResolver {
    fn default() -> Self {
        Self::new(None, LOCAL_CONFIG_PATH, DEPLOYMENT_CONFIG_PATH)
    }
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Candidates {
        _dir: TempDir,
        local: PathBuf,
        deployment: PathBuf,
    }

    fn candidates(local: bool, deployment: bool) -> Candidates {
        let dir = TempDir::new().unwrap();
        let local_path = dir.path().join("local.yaml");
        let deployment_path = dir.path().join("deployment.yaml");
        if local {
            fs::write(&local_path, "version: 1\n").unwrap();
        }
        if deployment {
            fs::write(&deployment_path, "version: 1\n").unwrap();
        }
        Candidates { _dir: dir, local: local_path, deployment: deployment_path }
    }

    #[test]
    fn test_env_override_wins_over_files() {
        let c = candidates(true, true);
        let resolver = LogConfigResolver::new(Some("/custom/path.yaml".into()), &c.local, &c.deployment);
        assert_eq!(resolver.resolve(), LogSource::Path(PathBuf::from("/custom/path.yaml")));
    }

    #[test]
    fn test_empty_env_override_is_ignored() {
        let c = candidates(true, false);
        let resolver = LogConfigResolver::new(Some(String::new()), &c.local, &c.deployment);
        assert_eq!(resolver.resolve(), LogSource::Path(c.local.clone()));
    }

    #[test]
    fn test_local_file_wins_over_deployment() {
        let c = candidates(true, true);
        let resolver = LogConfigResolver::new(None, &c.local, &c.deployment);
        assert_eq!(resolver.resolve(), LogSource::Path(c.local.clone()));
    }

    #[test]
    fn test_deployment_file_used_when_local_missing() {
        let c = candidates(false, true);
        let resolver = LogConfigResolver::new(None, &c.local, &c.deployment);
        assert_eq!(resolver.resolve(), LogSource::Path(c.deployment.clone()));
    }

    #[test]
    fn test_builtin_when_nothing_exists() {
        let c = candidates(false, false);
        let resolver = LogConfigResolver::new(None, &c.local, &c.deployment);
        assert_eq!(resolver.resolve(), LogSource::Builtin(LoggingConfig::builtin(None)));
    }

    #[test]
    fn test_from_lookup_reads_override() {
        let resolver = LogConfigResolver::from_lookup(|key| {
            (key == LOG_CONFIG_ENV).then(|| "/etc/job/log.yaml".to_string())
        });
        assert_eq!(resolver.resolve(), LogSource::Path(PathBuf::from("/etc/job/log.yaml")));
    }

    fn lookup_from(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    fn builtin_gelf(resolver: &LogConfigResolver) -> Option<(String, u16)> {
        let LogSource::Builtin(config) = resolver.resolve() else {
            return None;
        };
        let handler = config.handlers.get("gelf")?;
        let host = handler.options["host"].as_str()?.to_string();
        let port = handler.options["port"].as_u64()? as u16;
        Some((host, port))
    }

    #[test]
    fn test_gelf_host_enables_builtin_gelf_handler() {
        let c = candidates(false, false);
        let resolver = LogConfigResolver::from_lookup(lookup_from(&[(GELF_HOST_ENV, "graylog.internal")]));
        let resolver = LogConfigResolver { local_path: c.local.clone(), deployment_path: c.deployment.clone(), ..resolver };
        assert_eq!(builtin_gelf(&resolver), Some(("graylog.internal".to_string(), 4545)));

        let resolver = LogConfigResolver::from_lookup(lookup_from(&[
            (GELF_HOST_ENV, "graylog.internal"),
            (GELF_PORT_ENV, "12201"),
        ]));
        let resolver = LogConfigResolver { local_path: c.local.clone(), deployment_path: c.deployment.clone(), ..resolver };
        assert_eq!(builtin_gelf(&resolver), Some(("graylog.internal".to_string(), 12201)));
    }

    #[test]
    fn test_bad_gelf_port_uses_default() {
        let c = candidates(false, false);
        let resolver = LogConfigResolver::from_lookup(lookup_from(&[
            (GELF_HOST_ENV, "graylog.internal"),
            (GELF_PORT_ENV, "not-a-port"),
        ]));
        let resolver = LogConfigResolver { local_path: c.local.clone(), deployment_path: c.deployment.clone(), ..resolver };
        assert_eq!(builtin_gelf(&resolver), Some(("graylog.internal".to_string(), DEFAULT_GELF_PORT)));
    }

    #[test]
    fn test_no_gelf_host_means_console_only() {
        let c = candidates(false, false);
        let resolver = LogConfigResolver::from_lookup(lookup_from(&[(GELF_HOST_ENV, "  "), (GELF_PORT_ENV, "12201")]));
        let resolver = LogConfigResolver { local_path: c.local.clone(), deployment_path: c.deployment.clone(), ..resolver };
        assert_eq!(resolver.resolve(), LogSource::Builtin(LoggingConfig::builtin(None)));
    }
}
