//! Run context: the validated (environment, team) pair for one invocation.

use std::fmt;

use clap::ValueEnum;

/// Deployment environment the job runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Dev,
    Uat,
    Prd,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Uat => "uat",
            Environment::Prd => "prd",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team owning the configuration bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Team {
    Acad,
    Admsol,
    Ident,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Acad => "acad",
            Team::Admsol => "admsol",
            Team::Ident => "ident",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-invocation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    environment: Environment,
    team: Team,
}

impl RunContext {
    pub fn new(environment: Environment, team: Team) -> Self {
        Self { environment, team }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn team(&self) -> Team {
        self.team
    }

    /// Composite `team,environment` key selecting the configuration bundle.
    pub fn profile_key(&self) -> String {
        format!("{},{}", self.team, self.environment)
    }
}
