//! Athena configuration service access.
//!
//! # Data Flow
//! ```text
//! AthenaSettings (ATHENA_URL, ATHENA_SECRET, ...)
//!     → AthenaClientFactory::connect(job, env, team, profiles)
//!     → AthenaClient::get_properties()
//!         GET {url}/{job}/{profiles}[/{label}]
//!     → ConfigEnvironment → flattened PropertySet
//! ```
//!
//! # Design Decisions
//! - The job runner only sees the [`PropertySource`] and
//!   [`PropertySourceFactory`] traits, so tests can swap the service out
//! - "No properties" is `Ok(None)`, never an error

pub mod client;
pub mod types;

use std::future::Future;

pub use client::{AthenaClient, AthenaClientFactory};
pub use types::{AthenaError, AthenaResult, PropertySet};

use crate::job::{Environment, Team};

/// Something that can hand out a profile's properties.
pub trait PropertySource {
    /// Fetch all properties, or `None` when none are available.
    fn get_properties(&self) -> impl Future<Output = AthenaResult<Option<PropertySet>>> + Send;

    /// Look up one property. Missing keys are not an error.
    fn get_property_value(&self, name: &str, properties: &PropertySet) -> Option<String> {
        properties.get(name).cloned()
    }
}

/// Creates a [`PropertySource`] for one run.
pub trait PropertySourceFactory {
    type Source: PropertySource;

    fn connect(
        &self,
        job_name: &str,
        environment: Environment,
        team: Team,
        profiles: &str,
    ) -> AthenaResult<Self::Source>;
}
