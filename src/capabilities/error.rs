//! Configuration errors for the capability subsystem.
//!
//! Policy denials are never errors; they are returned as
//! [`EnforcementResult`](super::EnforcementResult) values. Only setup-time
//! misconfiguration surfaces here.

use thiserror::Error;

/// Errors raised while building capability policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// A preset name that is not one of `default`, `restricted`, `coordinator`.
    #[error("unknown capability preset: {0}")]
    UnknownPreset(String),

    /// A string value that does not parse into the named policy enum.
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    /// A host configuration document could not be decoded.
    #[error("capability configuration error: {0}")]
    Config(String),
}

impl CapabilityError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

impl From<serde_yaml::Error> for CapabilityError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CapabilityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
