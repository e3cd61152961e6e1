//! Configuration service HTTP client.
//!
//! # Responsibilities
//! - Build the profile endpoint from settings and the run's identity
//! - Fetch the config environment document and flatten it
//! - Tell "no properties available" apart from real failures
//!
//! # Design Decisions
//! - Missing credential, 401, 403 and 404 all mean "unavailable" (`Ok(None)`);
//!   the caller decides how loudly to fail
//! - Timeouts are distinct from other transport errors
//! - The whole request is bounded by the configured timeout

use std::future::Future;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use url::Url;

use crate::athena::types::{AthenaError, AthenaResult, ConfigEnvironment, PropertySet};
use crate::athena::{PropertySource, PropertySourceFactory};
use crate::config::athena::AthenaSettings;
use crate::job::{Environment, Team};

/// Client bound to one (job, profiles) endpoint.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    http: reqwest::Client,
    endpoint: Url,
    secret: Option<String>,
    timeout_secs: u64,
}

impl AthenaClient {
    /// Create a client for `job_name` and `profiles`.
    ///
    /// # Returns
    /// A client, or an error if the base URL is unusable
    pub fn new(
        settings: &AthenaSettings,
        job_name: &str,
        environment: Environment,
        team: Team,
        profiles: &str,
    ) -> AthenaResult<Self> {
        let invalid = |reason: String| AthenaError::InvalidUrl {
            url: settings.url.clone(),
            reason,
        };

        let mut endpoint = Url::parse(&settings.url).map_err(|e| invalid(e.to_string()))?;
        {
            let mut segments = endpoint
                .path_segments_mut()
                .map_err(|_| invalid("URL cannot be a base".to_string()))?;
            segments.pop_if_empty().push(job_name).push(profiles);
            if let Some(label) = &settings.label {
                segments.push(label);
            }
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(AthenaError::Http)?;

        tracing::debug!(
            endpoint = %endpoint,
            env = %environment,
            team = %team,
            "Configuration client initialized"
        );

        Ok(Self {
            http,
            endpoint,
            secret: settings.secret.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch and flatten the profile's properties.
    pub async fn fetch_properties(&self) -> AthenaResult<Option<PropertySet>> {
        let Some(secret) = self.secret.as_deref() else {
            tracing::warn!("No configuration service credential; skipping fetch");
            return Ok(None);
        };

        let response = self
            .http
            .get(self.endpoint.clone())
            .bearer_auth(secret)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Configuration service has no properties for this credential/profile"
            );
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AthenaError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let document: ConfigEnvironment =
            serde_json::from_slice(&body).map_err(AthenaError::Decode)?;

        tracing::debug!(
            name = %document.name,
            sources = document.property_sources.len(),
            "Configuration document received"
        );

        Ok(Some(document.flatten()))
    }

    fn transport_error(&self, err: reqwest::Error) -> AthenaError {
        if err.is_timeout() {
            AthenaError::Timeout(self.timeout_secs)
        } else {
            AthenaError::Http(err)
        }
    }
}

impl PropertySource for AthenaClient {
    fn get_properties(&self) -> impl Future<Output = AthenaResult<Option<PropertySet>>> + Send {
        self.fetch_properties()
    }
}

/// Builds [`AthenaClient`]s from shared settings.
#[derive(Debug, Clone, Default)]
pub struct AthenaClientFactory {
    settings: AthenaSettings,
}

impl AthenaClientFactory {
    pub fn new(settings: AthenaSettings) -> Self {
        Self { settings }
    }
}

impl PropertySourceFactory for AthenaClientFactory {
    type Source = AthenaClient;

    fn connect(
        &self,
        job_name: &str,
        environment: Environment,
        team: Team,
        profiles: &str,
    ) -> AthenaResult<AthenaClient> {
        AthenaClient::new(&self.settings, job_name, environment, team, profiles)
    }
}
