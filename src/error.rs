use thiserror::Error;

use crate::domain::{Kind, TargetEnvironment};

/// Exit status for bad input data (`EX_DATAERR` from sysexits.h).
pub const EXIT_DATA_ERROR: i32 = 65;

/// Exit status for a temporary failure (`EX_TEMPFAIL` from sysexits.h).
pub const EXIT_TEMP_FAILURE: i32 = 75;

/// Exit status after an interrupt.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Configuration-related errors with structured variants.
///
/// Every variant is fatal for a provisioning run: the input can never
/// converge, so the run stops before (or as soon as) it is detected.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to parse use case file: {0}")]
    ParseUsecase(#[source] serde_json::Error),

    #[error("the target environment '{0}' is not supported")]
    UnsupportedEnvironment(TargetEnvironment),

    #[error("{kind} '{name}' requires unknown {dependency_kind} '{dependency}'")]
    UnresolvedDependency {
        kind: Kind,
        name: String,
        dependency_kind: Kind,
        dependency: String,
    },

    #[error("{kind} '{name}' is defined more than once")]
    DuplicateName { kind: Kind, name: String },

    #[error("{kind} '{name}' requires itself")]
    SelfReference { kind: Kind, name: String },

    #[error("{kind} '{name}' requires entitle-only {prerequisite_kind} '{prerequisite}', which is never created")]
    UnsatisfiablePrerequisite {
        kind: Kind,
        name: String,
        prerequisite_kind: Kind,
        prerequisite: String,
    },

    #[error("{kind} '{name}' is part of a dependency cycle")]
    DependencyCycle { kind: Kind, name: String },
}

/// Provisioning-related errors raised while the control loops run.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("subscription to app '{app}' has failed")]
    SubscriptionFailed { app: String },

    #[error("creation of service instance '{service}' has failed")]
    InstanceFailed { service: String },

    #[error("could not get all services and app subscriptions up and running within {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    #[error("provisioning cancelled")]
    Cancelled,

    #[error("command '{program}' failed: {reason}")]
    Command { program: String, reason: String },

    #[error("unexpected response from '{program}': {reason}")]
    UnexpectedResponse { program: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures that must stop the run immediately.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Provision(
                    ProvisionError::SubscriptionFailed { .. }
                        | ProvisionError::InstanceFailed { .. }
                        | ProvisionError::Cancelled
                )
        )
    }

    /// Process exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::Provision(
                ProvisionError::SubscriptionFailed { .. } | ProvisionError::InstanceFailed { .. },
            ) => EXIT_DATA_ERROR,
            Error::Provision(ProvisionError::Timeout { .. }) => EXIT_TEMP_FAILURE,
            Error::Provision(ProvisionError::Cancelled) => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_and_external_failures_share_data_error_code() {
        let config: Error =
            ConfigError::UnsupportedEnvironment(TargetEnvironment::KymaRuntime).into();
        let failed: Error = ProvisionError::SubscriptionFailed {
            app: "audit-log".into(),
        }
        .into();

        assert_eq!(config.exit_code(), EXIT_DATA_ERROR);
        assert_eq!(failed.exit_code(), EXIT_DATA_ERROR);
        assert!(config.is_fatal());
        assert!(failed.is_fatal());
    }

    #[test]
    fn timeout_is_distinguished_from_failure() {
        let err: Error = ProvisionError::Timeout { elapsed_secs: 60 }.into();
        assert_eq!(err.exit_code(), EXIT_TEMP_FAILURE);
        assert!(!err.is_fatal());
    }

    #[test]
    fn transient_command_failure_is_not_fatal() {
        let err: Error = ProvisionError::Command {
            program: "btp".into(),
            reason: "exit status 1".into(),
        }
        .into();
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), 1);
    }
}
