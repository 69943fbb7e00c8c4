//! Shared domain enums used across entities, services and the API layer.

use serde::{Deserialize, Serialize};

/// Status shared by apps and deployments.
///
/// Deployments only ever move `Pending -> Deploying -> Running | Failed`;
/// apps additionally use `Stopped` for manual stop/start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Pending,
    Deploying,
    Running,
    Stopped,
    Failed,
}

impl AppStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Deploying => "deploying",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "deploying" => Some(Self::Deploying),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states set `completed_at` and are never left by the pipeline.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Running | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Github,
    Docker,
    Script,
}

impl SourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Docker => "docker",
            Self::Script => "script",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "github" => Some(Self::Github),
            "docker" => Some(Self::Docker),
            "script" => Some(Self::Script),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionRuntime {
    Python,
    Nodejs,
}

impl FunctionRuntime {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Nodejs => "nodejs",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "python" => Some(Self::Python),
            "nodejs" => Some(Self::Nodejs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AppStatus::Pending,
            AppStatus::Deploying,
            AppStatus::Running,
            AppStatus::Stopped,
            AppStatus::Failed,
        ] {
            assert_eq!(AppStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(AppStatus::Running.is_terminal());
        assert!(AppStatus::Failed.is_terminal());
        assert!(!AppStatus::Pending.is_terminal());
        assert!(!AppStatus::Deploying.is_terminal());
    }
}
