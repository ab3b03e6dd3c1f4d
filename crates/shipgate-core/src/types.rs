use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Deployment target tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Qa,
    Uat,
    Prod,
}

impl Environment {
    pub fn all() -> &'static [Environment] {
        &[Environment::Qa, Environment::Uat, Environment::Prod]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Uat => "uat",
            Environment::Prod => "prod",
        }
    }

    /// Name of the matching environment in the release system.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Environment::Qa => "QA",
            Environment::Uat => "UAT",
            Environment::Prod => "Production",
        }
    }

    pub fn upper(self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = crate::error::ShipgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qa" => Ok(Environment::Qa),
            "uat" => Ok(Environment::Uat),
            "prod" => Ok(Environment::Prod),
            _ => Err(crate::error::ShipgateError::InvalidEnvironment(
                s.to_string(),
            )),
        }
    }
}

/// Map an environment token to the release system's environment name.
///
/// Unknown tokens pass through unchanged.
pub fn canonical_environment_name(token: &str) -> String {
    match token.to_ascii_lowercase().parse::<Environment>() {
        Ok(env) => env.canonical_name().to_string(),
        Err(_) => token.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Build,
    Deploy,
    Status,
    Rollback,
    History,
    Help,
    Unknown,
}

impl ActionKind {
    /// The recognised command vocabulary (`unknown` is never typed by a user).
    pub fn vocabulary() -> &'static [ActionKind] {
        &[
            ActionKind::Build,
            ActionKind::Deploy,
            ActionKind::Status,
            ActionKind::Rollback,
            ActionKind::History,
            ActionKind::Help,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Build => "build",
            ActionKind::Deploy => "deploy",
            ActionKind::Status => "status",
            ActionKind::Rollback => "rollback",
            ActionKind::History => "history",
            ActionKind::Help => "help",
            ActionKind::Unknown => "unknown",
        }
    }

    /// Look up a token in the vocabulary, ignoring case.
    pub fn from_token(token: &str) -> Option<ActionKind> {
        let lower = token.to_ascii_lowercase();
        Self::vocabulary()
            .iter()
            .copied()
            .find(|a| a.as_str() == lower)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
